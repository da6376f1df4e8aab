//! Participant listing and updates (§4.H). `getAll`/`getActive` page
//! through the server's marker-based pagination, stopping on `hasMore ==
//! false` or an empty page (guards against an inconsistent `hasMore`).

use interactive_protocol::method_names::client_to_server;
use serde_json::Value;

use crate::error::InteractiveError;
use crate::resources::SessionHandle;

pub struct Participants {
    session: SessionHandle,
}

impl Participants {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Participants { session }
    }

    /// All participants ever seen, ordered by `connectedAt` ascending.
    pub async fn get_all(&self, from: u64) -> Result<Vec<Value>, InteractiveError> {
        self.paginate(client_to_server::GET_ALL_PARTICIPANTS, "from", "connectedAt", from).await
    }

    /// Participants active since `threshold`, ordered by `lastInputAt` ascending.
    pub async fn get_active(&self, threshold: u64) -> Result<Vec<Value>, InteractiveError> {
        self.paginate(client_to_server::GET_ACTIVE_PARTICIPANTS, "threshold", "lastInputAt", threshold).await
    }

    async fn paginate(
        &self,
        method: &str,
        marker_key: &str,
        timestamp_field: &str,
        start: u64,
    ) -> Result<Vec<Value>, InteractiveError> {
        let mut marker = start;
        let mut out = Vec::new();

        loop {
            let reply = self.session.call(method, serde_json::json!({ marker_key: marker })).await?;
            let page: Vec<Value> = reply
                .get("participants")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();

            if page.is_empty() {
                break;
            }

            let last_ts = page.last().and_then(|p| p.get(timestamp_field)).and_then(Value::as_u64);
            out.extend(page);

            let has_more = reply.get("hasMore").and_then(Value::as_bool).unwrap_or(false);
            if !has_more {
                break;
            }
            match last_ts {
                Some(ts) => marker = ts,
                None => break,
            }
        }

        Ok(out)
    }

    /// `updateParticipants`: a flat batch, transactional at the service.
    pub async fn update(&self, participants: Vec<Value>) -> Result<(), InteractiveError> {
        self.session
            .call(client_to_server::UPDATE_PARTICIPANTS, serde_json::json!({ "participants": participants }))
            .await?;
        Ok(())
    }
}
