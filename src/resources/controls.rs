//! Control batched writes (§4.H). `create`/`update` accept a flat set of
//! controls spanning multiple scenes; the module groups them by parent
//! scene (each control carries its own `"sceneID"` field) and issues one
//! server call per scene, running the grouped calls concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use interactive_protocol::method_names::client_to_server;
use serde_json::Value;

use crate::error::InteractiveError;
use crate::resources::SessionHandle;

pub struct Controls {
    session: SessionHandle,
}

impl Controls {
    pub(crate) fn new(session: SessionHandle) -> Self {
        Controls { session }
    }

    /// Groups `controls` by `sceneID` and issues one `createControls` call
    /// per scene concurrently. Returns one entry per input control, keyed by
    /// its position in `controls`, holding the outcome of *that control's
    /// scene's* call — one scene's `ReplyWithError` never discards another
    /// scene's successful result.
    pub async fn create(&self, controls: Vec<Value>) -> HashMap<usize, Arc<Result<Value, InteractiveError>>> {
        self.batched_write(client_to_server::CREATE_CONTROLS, controls, 0).await
    }

    /// As `create`, but carries an integer `priority` the server uses to
    /// order concurrent updates (default 0).
    pub async fn update(
        &self,
        controls: Vec<Value>,
        priority: i64,
    ) -> HashMap<usize, Arc<Result<Value, InteractiveError>>> {
        self.batched_write(client_to_server::UPDATE_CONTROLS, controls, priority).await
    }

    async fn batched_write(
        &self,
        method: &str,
        controls: Vec<Value>,
        priority: i64,
    ) -> HashMap<usize, Arc<Result<Value, InteractiveError>>> {
        let mut by_scene: HashMap<String, (Vec<usize>, Vec<Value>)> = HashMap::new();
        let mut out: HashMap<usize, Arc<Result<Value, InteractiveError>>> = HashMap::new();

        for (index, control) in controls.into_iter().enumerate() {
            match control.get("sceneID").and_then(Value::as_str) {
                Some(scene_id) => {
                    let group = by_scene.entry(scene_id.to_owned()).or_default();
                    group.0.push(index);
                    group.1.push(control);
                }
                None => {
                    out.insert(index, Arc::new(Err(InteractiveError::MissingSceneId { index })));
                }
            }
        }

        let calls = by_scene.into_iter().map(|(scene_id, (indices, group))| {
            let params = serde_json::json!({ "sceneID": scene_id, "controls": group, "priority": priority });
            let call = self.session.call(method, params);
            async move { (indices, call.await) }
        });

        for (indices, result) in join_all(calls).await {
            let outcome = Arc::new(result);
            for index in indices {
                out.insert(index, outcome.clone());
            }
        }
        out
    }

    /// Groups `(scene_id, control_id)` pairs by scene and issues one
    /// `deleteControls` call per scene. Rejects the whole batch up front if
    /// any pair carries an empty `scene_id` rather than silently issuing a
    /// call for scene `""`.
    pub async fn delete(&self, targets: Vec<(String, String)>) -> Result<(), InteractiveError> {
        let mut by_scene: HashMap<String, Vec<String>> = HashMap::new();
        for (index, (scene_id, control_id)) in targets.into_iter().enumerate() {
            if scene_id.is_empty() {
                return Err(InteractiveError::MissingSceneId { index });
            }
            by_scene.entry(scene_id).or_default().push(control_id);
        }

        let calls = by_scene.into_iter().map(|(scene_id, control_ids)| {
            let params = serde_json::json!({ "sceneID": scene_id, "controlIDs": control_ids });
            self.session.call(client_to_server::DELETE_CONTROLS, params)
        });

        for result in join_all(calls).await {
            result?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_scene_id_error_names_the_offending_index() {
        let err = InteractiveError::MissingSceneId { index: 3 };
        assert_eq!(err.to_string(), "control at index 3 is missing a parent sceneID");
    }
}
