//! Client configuration (§3.1 ambient addition) and the participant
//! identifier shape (Open Question 4 in SPEC_FULL.md).

use crate::error::ConfigError;

const DEFAULT_DISCOVERY_URL: &str = "https://mixer.com/api/v1/interactive/hosts";

/// Configuration the facade is built from. Analogous to the teacher's
/// `ForwarderConfig`, except assembled programmatically rather than loaded
/// from a TOML file, since this is an embedded library, not a daemon.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub version_id: u64,
    pub token: String,
    pub share_code: Option<String>,
    pub enable_cache: bool,
    pub discovery_url: String,
}

impl ClientConfig {
    pub fn new(version_id: u64, token: impl Into<String>) -> Self {
        ClientConfig {
            version_id,
            token: token.into(),
            share_code: None,
            enable_cache: true,
            discovery_url: DEFAULT_DISCOVERY_URL.to_owned(),
        }
    }

    pub fn with_share_code(mut self, share_code: impl Into<String>) -> Self {
        self.share_code = Some(share_code.into());
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.enable_cache = enabled;
        self
    }

    pub fn with_discovery_url(mut self, url: impl Into<String>) -> Self {
        self.discovery_url = url.into();
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.token.trim().is_empty() {
            return Err(ConfigError::EmptyToken);
        }
        if !self.discovery_url.starts_with("http://") && !self.discovery_url.starts_with("https://") {
            return Err(ConfigError::InvalidDiscoveryUrl(self.discovery_url.clone()));
        }
        Ok(())
    }

    /// The `Authorization` header value per §6: `Bearer <token>` unless the
    /// token already carries the `XBL3.0` scheme, which is passed verbatim.
    pub(crate) fn auth_header_value(&self) -> String {
        if self.token.starts_with("XBL3.0") {
            self.token.clone()
        } else {
            format!("Bearer {}", self.token)
        }
    }
}

/// A structured participant identifier: `(session_id, user_id)`, both opaque
/// strings. See SPEC_FULL.md §3.1 / Open Question 4.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct ParticipantId {
    #[serde(rename = "sessionID")]
    pub session_id: String,
    #[serde(rename = "userID")]
    pub user_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xbl_token_passes_through_verbatim() {
        let cfg = ClientConfig::new(1, "XBL3.0 x=abc;y=def");
        assert_eq!(cfg.auth_header_value(), "XBL3.0 x=abc;y=def");
    }

    #[test]
    fn ordinary_token_gets_bearer_prefix() {
        let cfg = ClientConfig::new(1, "abc123");
        assert_eq!(cfg.auth_header_value(), "Bearer abc123");
    }

    #[test]
    fn empty_token_fails_validation() {
        let cfg = ClientConfig::new(1, "  ");
        assert!(matches!(cfg.validate(), Err(ConfigError::EmptyToken)));
    }
}
