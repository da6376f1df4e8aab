//! Scene batched writes (§4.H) — same shape as `groups`, one transactional
//! call per batch.

use interactive_protocol::method_names::client_to_server;
use serde_json::Value;

use crate::error::InteractiveError;
use crate::resources::SessionHandle;

const DEFAULT_REASSIGNMENT_TARGET: &str = "default";

pub struct Scenes {
    session: SessionHandle,
}

impl Scenes {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Scenes { session }
    }

    pub async fn create(&self, scenes: Vec<Value>) -> Result<Vec<Value>, InteractiveError> {
        let reply = self
            .session
            .call(client_to_server::CREATE_SCENES, serde_json::json!({ "scenes": scenes }))
            .await?;
        Ok(reply.get("scenes").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    pub async fn get(&self) -> Result<Vec<Value>, InteractiveError> {
        let reply = self.session.call(client_to_server::GET_SCENES, serde_json::json!({})).await?;
        Ok(reply.get("scenes").and_then(Value::as_array).cloned().unwrap_or_default())
    }

    pub async fn update(&self, scenes: Vec<Value>) -> Result<(), InteractiveError> {
        self.session
            .call(client_to_server::UPDATE_SCENES, serde_json::json!({ "scenes": scenes }))
            .await?;
        Ok(())
    }

    /// A `None` reassignment target defaults to `"default"`.
    pub async fn delete(&self, scene_id: impl Into<String>, reassign_scene_id: Option<String>) -> Result<(), InteractiveError> {
        let reassign = reassign_scene_id.unwrap_or_else(|| DEFAULT_REASSIGNMENT_TARGET.to_owned());
        self.session
            .call(
                client_to_server::DELETE_SCENE,
                serde_json::json!({ "sceneID": scene_id.into(), "reassignSceneID": reassign }),
            )
            .await?;
        Ok(())
    }
}
