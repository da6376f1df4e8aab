//! State cache (§4.I): a pure event consumer that mirrors the scene graph.
//! Opt-in at client construction; never issues RPCs; a desync is logged and
//! dropped rather than propagated, since the next full event rehydrates it.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::task::JoinHandle;

use crate::config::ParticipantId;
use crate::events::{Event, EventDispatcher};

const DEFAULT_REASSIGNMENT_TARGET: &str = "default";

#[derive(Default)]
struct Mirror {
    scenes: HashMap<String, Value>,
    groups: HashMap<String, Value>,
    controls: HashMap<String, HashMap<String, Value>>,
    participants: HashMap<ParticipantId, Value>,
}

/// Map-of-sets mirror of the authoritative scene graph, kept live by
/// subscribing to the event dispatcher.
pub struct StateCache {
    mirror: std::sync::Arc<Mutex<Mirror>>,
    _task: JoinHandle<()>,
}

impl StateCache {
    /// Spawn a background task that consumes `dispatcher`'s event stream
    /// and applies deltas to the mirror.
    pub fn attach(dispatcher: &EventDispatcher) -> Self {
        let mirror = std::sync::Arc::new(Mutex::new(Mirror::default()));
        let task_mirror = mirror.clone();
        let mut rx = dispatcher.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => apply(&task_mirror, event),
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        tracing::debug!(missed = n, "state cache lagged, continuing from here");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        StateCache { mirror, _task: task }
    }

    pub fn scene(&self, scene_id: &str) -> Option<Value> {
        self.mirror.lock().unwrap().scenes.get(scene_id).cloned()
    }

    pub fn scenes(&self) -> Vec<Value> {
        self.mirror.lock().unwrap().scenes.values().cloned().collect()
    }

    pub fn group(&self, group_id: &str) -> Option<Value> {
        self.mirror.lock().unwrap().groups.get(group_id).cloned()
    }

    pub fn groups(&self) -> Vec<Value> {
        self.mirror.lock().unwrap().groups.values().cloned().collect()
    }

    pub fn controls_in_scene(&self, scene_id: &str) -> Vec<Value> {
        self.mirror
            .lock()
            .unwrap()
            .controls
            .get(scene_id)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn participant(&self, id: &ParticipantId) -> Option<Value> {
        self.mirror.lock().unwrap().participants.get(id).cloned()
    }

    pub fn participants(&self) -> Vec<Value> {
        self.mirror.lock().unwrap().participants.values().cloned().collect()
    }
}

fn apply(mirror: &Mutex<Mirror>, event: Event) {
    let mut m = mirror.lock().unwrap();
    match event {
        Event::SceneCreate { params, .. } | Event::SceneUpdate { params, .. } => {
            for scene in values_array(&params, "scenes") {
                if let Some(id) = string_field(scene, "sceneID") {
                    m.scenes.insert(id, scene.clone());
                }
            }
        }
        Event::SceneDelete { params, .. } => {
            let Some(scene_id) = params.get("sceneID").and_then(Value::as_str) else { return };
            let reassign = params
                .get("reassignSceneID")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_REASSIGNMENT_TARGET)
                .to_owned();
            m.scenes.remove(scene_id);
            if let Some(controls) = m.controls.remove(scene_id) {
                m.controls.entry(reassign.clone()).or_default().extend(controls);
            }
            for group in m.groups.values_mut() {
                if group.get("sceneID").and_then(Value::as_str) == Some(scene_id) {
                    if let Value::Object(obj) = group {
                        obj.insert("sceneID".to_owned(), Value::String(reassign.clone()));
                    }
                }
            }
        }
        Event::GroupCreate { params, .. } | Event::GroupUpdate { params, .. } => {
            for group in values_array(&params, "groups") {
                if let Some(id) = string_field(group, "groupID") {
                    m.groups.insert(id, group.clone());
                }
            }
        }
        Event::GroupDelete { params, .. } => {
            let Some(group_id) = params.get("groupID").and_then(Value::as_str) else { return };
            let reassign = params
                .get("reassignGroupID")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_REASSIGNMENT_TARGET)
                .to_owned();
            m.groups.remove(group_id);
            for participant in m.participants.values_mut() {
                if participant.get("groupID").and_then(Value::as_str) == Some(group_id) {
                    if let Value::Object(obj) = participant {
                        obj.insert("groupID".to_owned(), Value::String(reassign.clone()));
                    }
                }
            }
        }
        Event::ControlCreate { params, .. } | Event::ControlUpdate { params, .. } => {
            let Some(scene_id) = params.get("sceneID").and_then(Value::as_str) else { return };
            let bucket = m.controls.entry(scene_id.to_owned()).or_default();
            for control in values_array(&params, "controls") {
                if let Some(id) = string_field(control, "controlID") {
                    bucket.insert(id, control.clone());
                }
            }
        }
        Event::ControlDelete { params, .. } => {
            let Some(scene_id) = params.get("sceneID").and_then(Value::as_str) else { return };
            let Some(bucket) = m.controls.get_mut(scene_id) else { return };
            if let Some(ids) = params.get("controlIDs").and_then(Value::as_array) {
                for id in ids.iter().filter_map(Value::as_str) {
                    bucket.remove(id);
                }
            }
        }
        Event::ParticipantJoin { params, .. } | Event::ParticipantUpdate { params, .. } => {
            for participant in values_array(&params, "participants") {
                if let Some(id) = participant_id(participant) {
                    m.participants.insert(id, participant.clone());
                }
            }
        }
        Event::ParticipantLeave { params, .. } => {
            for participant in values_array(&params, "participants") {
                if let Some(id) = participant_id(participant) {
                    m.participants.remove(&id);
                }
            }
        }
        _ => {}
    }
}

fn values_array<'a>(params: &'a Value, key: &str) -> &'a [Value] {
    params.get(key).and_then(Value::as_array).map(Vec::as_slice).unwrap_or(&[])
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_owned)
}

fn participant_id(value: &Value) -> Option<ParticipantId> {
    Some(ParticipantId {
        session_id: string_field(value, "sessionID")?,
        user_id: string_field(value, "userID")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scene_create_then_delete_reassigns_controls() {
        let dispatcher = EventDispatcher::new();
        let cache = StateCache::attach(&dispatcher);

        dispatcher.dispatch(
            1,
            1,
            "onSceneCreate",
            serde_json::json!({"scenes": [{"sceneID": "scene1"}, {"sceneID": "default"}]}),
        );
        dispatcher.dispatch(
            2,
            2,
            "onControlCreate",
            serde_json::json!({"sceneID": "scene1", "controls": [{"controlID": "btn1"}]}),
        );
        dispatcher.dispatch(
            3,
            3,
            "onSceneDelete",
            serde_json::json!({"sceneID": "scene1", "reassignSceneID": "default"}),
        );

        tokio::task::yield_now().await;
        // Allow the background consumer task a scheduling slot.
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(cache.scene("scene1").is_none());
        assert_eq!(cache.controls_in_scene("default").len(), 1);
    }

    #[tokio::test]
    async fn participant_join_then_leave_removes_entry() {
        let dispatcher = EventDispatcher::new();
        let cache = StateCache::attach(&dispatcher);
        let participant = serde_json::json!({"sessionID": "s1", "userID": "u1"});

        dispatcher.dispatch(1, 1, "onParticipantJoin", serde_json::json!({"participants": [participant.clone()]}));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(cache.participants().len(), 1);

        dispatcher.dispatch(2, 2, "onParticipantLeave", serde_json::json!({"participants": [participant]}));
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(cache.participants().len(), 0);
    }
}
