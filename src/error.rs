//! Error taxonomy for the session client (§7). Every public async method
//! returns `InteractiveError`; the per-call completion sink (§4.E) is the
//! only place a failure is produced, never recovered locally.

use interactive_protocol::CodecError;

/// A structured error the service attached to a reply.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{method}: service error {code}: {message}")]
pub struct ReplyError {
    pub method: String,
    pub code: i64,
    pub message: String,
    pub path: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InteractiveError {
    #[error("no candidate endpoints returned by discovery")]
    NoHostsFound,

    #[error("connect failed against all {tried} candidate(s): {causes}")]
    ConnectionFailed { tried: usize, causes: String },

    #[error("transport closed while a call to {method} was pending")]
    TransportClosed { method: String },

    #[error("no reply to {method} within the request timeout")]
    ReplyTimeout { method: String },

    #[error("control at index {index} is missing a parent sceneID")]
    MissingSceneId { index: usize },

    #[error(transparent)]
    ReplyWithError(#[from] ReplyError),

    #[error("frame codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("compression error: {0}")]
    Compression(#[from] interactive_protocol::CompressionError),

    #[error("discovery request failed: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("invalid client configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("websocket error: {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    #[error("request to discovery endpoint failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("discovery endpoint returned status {0}")]
    BadStatus(reqwest::StatusCode),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("token must not be empty")]
    EmptyToken,
    #[error("discovery url is not a valid url: {0}")]
    InvalidDiscoveryUrl(String),
    #[error("invalid header value: {0}")]
    InvalidHeaderValue(String),
}
