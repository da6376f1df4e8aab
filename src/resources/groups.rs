//! Group batched writes (§4.H). One call per batch, transactional at the
//! service — this module surfaces that atomicity and never retries
//! partially.

use interactive_protocol::method_names::client_to_server;
use serde_json::Value;

use crate::error::InteractiveError;
use crate::resources::SessionHandle;

const DEFAULT_REASSIGNMENT_TARGET: &str = "default";

pub struct Groups {
    session: SessionHandle,
}

impl Groups {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Groups { session }
    }

    pub async fn create(&self, groups: Vec<Value>) -> Result<Vec<Value>, InteractiveError> {
        let reply = self
            .session
            .call(client_to_server::CREATE_GROUPS, serde_json::json!({ "groups": groups }))
            .await?;
        Ok(reply.get("groups").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    pub async fn get(&self) -> Result<Vec<Value>, InteractiveError> {
        let reply = self.session.call(client_to_server::GET_GROUPS, serde_json::json!({})).await?;
        Ok(reply.get("groups").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    pub async fn update(&self, groups: Vec<Value>) -> Result<(), InteractiveError> {
        self.session
            .call(client_to_server::UPDATE_GROUPS, serde_json::json!({ "groups": groups }))
            .await?;
        Ok(())
    }

    /// A `None` reassignment target defaults to `"default"`.
    pub async fn delete(&self, group_id: impl Into<String>, reassign_group_id: Option<String>) -> Result<(), InteractiveError> {
        let reassign = reassign_group_id.unwrap_or_else(|| DEFAULT_REASSIGNMENT_TARGET.to_owned());
        self.session
            .call(
                client_to_server::DELETE_GROUP,
                serde_json::json!({ "groupID": group_id.into(), "reassignGroupID": reassign }),
            )
            .await?;
        Ok(())
    }
}
