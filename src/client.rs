//! Facade (§4.J): binds a project version id, a token, and the session
//! components into one entry point.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use interactive_protocol::method_names::client_to_server;
use interactive_protocol::Scheme;

use crate::cache::StateCache;
use crate::config::ClientConfig;
use crate::controller::{ConnectedSession, ConnectionController};
use crate::error::InteractiveError;
use crate::events::EventStream;
use crate::resources::{Controls, Groups, Participants, Scenes, SessionHandle, Transactions};
use crate::transport::SessionState;

const KNOWN_SCHEMES: [&str; 3] = ["none", "gzip", "lz4"];

pub struct InteractiveClient {
    config: ClientConfig,
    session: RwLock<Option<Arc<ConnectedSession>>>,
    cache: RwLock<Option<Arc<StateCache>>>,
}

impl InteractiveClient {
    pub fn new(config: ClientConfig) -> Result<Self, InteractiveError> {
        config.validate()?;
        Ok(InteractiveClient {
            config,
            session: RwLock::new(None),
            cache: RwLock::new(None),
        })
    }

    /// Discover and dial a host, per §4.G. Replaces any existing session.
    pub async fn connect(&self) -> Result<(), InteractiveError> {
        let connected = Arc::new(ConnectionController::connect(&self.config).await?);

        if self.config.enable_cache {
            *self.cache.write().await = Some(Arc::new(StateCache::attach(&connected.dispatcher)));
        }
        *self.session.write().await = Some(connected);
        Ok(())
    }

    /// Closes the transport, failing every pending call with
    /// `TransportClosed` (§5 cancellation point (a)).
    pub async fn disconnect(&self) {
        if let Some(session) = self.session.write().await.take() {
            session.transport.close().await;
        }
        *self.cache.write().await = None;
    }

    /// Subscribe to the session's typed event stream. The locally-synthesized
    /// `ConnectionEstablished` notification is replayed to every subscriber
    /// exactly once, even though `connect` must return before a subscriber
    /// can attach.
    pub async fn subscribe(&self) -> Result<EventStream, InteractiveError> {
        Ok(self.session().await?.dispatcher.subscribe())
    }

    pub async fn ready(&self, is_ready: bool) -> Result<(), InteractiveError> {
        self.call(client_to_server::READY, serde_json::json!({ "isReady": is_ready })).await?;
        Ok(())
    }

    /// Filters `preferences` to recognized schemes, dedupes preserving
    /// order, sends, and applies the negotiated scheme to the transport
    /// before returning it (§4.H).
    pub async fn set_compression(&self, preferences: Vec<String>) -> Result<String, InteractiveError> {
        let mut seen = HashSet::new();
        let filtered: Vec<String> = preferences
            .into_iter()
            .filter(|name| KNOWN_SCHEMES.contains(&name.as_str()))
            .filter(|name| seen.insert(name.clone()))
            .collect();

        let session = self.session().await?;
        let reply = session
            .engine
            .call(&session.transport, client_to_server::SET_COMPRESSION, serde_json::json!({ "scheme": filtered }))
            .await?;
        let scheme_name = reply.get("scheme").and_then(Value::as_str).unwrap_or("none").to_owned();
        session.transport.set_scheme(Scheme::from_name(&scheme_name));
        Ok(scheme_name)
    }

    pub async fn get_time(&self) -> Result<Value, InteractiveError> {
        self.call(client_to_server::GET_TIME, serde_json::json!({})).await
    }

    pub async fn get_memory_stats(&self) -> Result<Value, InteractiveError> {
        self.call(client_to_server::GET_MEMORY_STATS, serde_json::json!({})).await
    }

    pub async fn get_throttle_state(&self) -> Result<Value, InteractiveError> {
        self.call(client_to_server::GET_THROTTLE_STATE, serde_json::json!({})).await
    }

    pub async fn set_bandwidth_throttle(&self, settings: Value) -> Result<(), InteractiveError> {
        self.call(client_to_server::SET_BANDWIDTH_THROTTLE, settings).await?;
        Ok(())
    }

    pub async fn scenes(&self) -> Result<Scenes, InteractiveError> {
        Ok(Scenes::new(self.handle().await?))
    }

    pub async fn controls(&self) -> Result<Controls, InteractiveError> {
        Ok(Controls::new(self.handle().await?))
    }

    pub async fn groups(&self) -> Result<Groups, InteractiveError> {
        Ok(Groups::new(self.handle().await?))
    }

    pub async fn participants(&self) -> Result<Participants, InteractiveError> {
        Ok(Participants::new(self.handle().await?))
    }

    pub async fn transactions(&self) -> Result<Transactions, InteractiveError> {
        Ok(Transactions::new(self.handle().await?))
    }

    /// `None` when the cache is disabled or the client has never connected.
    pub async fn cache(&self) -> Option<Arc<StateCache>> {
        self.cache.read().await.clone()
    }

    /// `Closed` before the first successful `connect`.
    pub async fn state(&self) -> SessionState {
        match self.session.read().await.as_ref() {
            Some(session) => session.transport.state().await,
            None => SessionState::Closed,
        }
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, InteractiveError> {
        let session = self.session().await?;
        session.engine.call(&session.transport, method, params).await
    }

    async fn handle(&self) -> Result<SessionHandle, InteractiveError> {
        Ok(SessionHandle(self.session().await?))
    }

    async fn session(&self) -> Result<Arc<ConnectedSession>, InteractiveError> {
        self.session
            .read()
            .await
            .clone()
            .ok_or_else(|| InteractiveError::TransportClosed { method: "<not connected>".to_owned() })
    }
}
