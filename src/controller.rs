//! Connection controller (§4.G): discovery → dial → handshake → ready,
//! with sequential fail-over across candidate endpoints.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::discovery;
use crate::error::InteractiveError;
use crate::events::{Event, EventDispatcher};
use crate::rpc::RpcEngine;
use crate::transport::Transport;

/// The bundle a successful connect attempt produces. Owned by the facade.
pub struct ConnectedSession {
    pub transport: Arc<Transport>,
    pub engine: Arc<RpcEngine>,
    pub dispatcher: Arc<EventDispatcher>,
}

pub struct ConnectionController;

impl ConnectionController {
    /// Discover candidate endpoints and dial them in order, stopping at the
    /// first success. On exhaustion, returns an aggregated error naming
    /// every candidate tried (invariant 6).
    pub async fn connect(config: &ClientConfig) -> Result<ConnectedSession, InteractiveError> {
        let endpoints = discovery::fetch_endpoints(&config.discovery_url).await?;

        if endpoints.is_empty() {
            return Err(InteractiveError::NoHostsFound);
        }

        let mut causes = Vec::with_capacity(endpoints.len());

        for candidate in &endpoints {
            let engine = Arc::new(RpcEngine::new());
            let dispatcher = Arc::new(EventDispatcher::new());

            match Transport::connect(candidate, config, engine.clone(), dispatcher.clone()).await {
                Ok(transport) => {
                    tracing::info!(candidate = %candidate, "connected");
                    dispatcher.set_established(Event::ConnectionEstablished {
                        candidate: candidate.clone(),
                    });
                    return Ok(ConnectedSession {
                        transport,
                        engine,
                        dispatcher,
                    });
                }
                Err(e) => {
                    tracing::debug!(candidate = %candidate, error = %e, "candidate failed, trying next");
                    causes.push(format!("{candidate}: {e}"));
                }
            }
        }

        Err(InteractiveError::ConnectionFailed {
            tried: endpoints.len(),
            causes: causes.join("; "),
        })
    }
}
