//! Host-discovery client (§4.C, §6.1). The only HTTP interaction in the
//! core — grounded on `services/receiver/src/control_api.rs::fetch_server_streams`'s
//! short-timeout `reqwest::Client` + `.json::<T>()` pattern.

use serde::Deserialize;
use std::time::Duration;

use crate::error::DiscoveryError;

const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DiscoveryResponse {
    Bare(Vec<String>),
    Wrapped { endpoints: Vec<String> },
}

impl DiscoveryResponse {
    fn into_endpoints(self) -> Vec<String> {
        match self {
            DiscoveryResponse::Bare(v) => v,
            DiscoveryResponse::Wrapped { endpoints } => endpoints,
        }
    }
}

/// Fetch the ordered candidate endpoint list. Returns an empty vec rather
/// than `NoHostsFound` directly — the caller (the connection controller)
/// decides what an empty list means, so this stays a pure I/O client.
pub async fn fetch_endpoints(discovery_url: &str) -> Result<Vec<String>, DiscoveryError> {
    let client = reqwest::Client::builder()
        .timeout(DISCOVERY_TIMEOUT)
        .build()
        .map_err(DiscoveryError::Request)?;

    let response = client.get(discovery_url).send().await?;
    if !response.status().is_success() {
        return Err(DiscoveryError::BadStatus(response.status()));
    }

    let body: DiscoveryResponse = response.json().await?;
    Ok(body.into_endpoints())
}
