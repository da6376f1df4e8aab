//! The closed set of recognized server-to-client method names, and the
//! typed `Event` they map onto (§4.F, §6).

use serde_json::Value;

/// Server-to-client method names the dispatcher recognizes.
pub const HELLO: &str = "hello";
pub const ON_READY: &str = "onReady";
pub const SET_COMPRESSION: &str = "setCompression";
pub const ISSUE_MEMORY_WARNING: &str = "issueMemoryWarning";
pub const ON_PARTICIPANT_JOIN: &str = "onParticipantJoin";
pub const ON_PARTICIPANT_LEAVE: &str = "onParticipantLeave";
pub const ON_PARTICIPANT_UPDATE: &str = "onParticipantUpdate";
pub const ON_GROUP_CREATE: &str = "onGroupCreate";
pub const ON_GROUP_DELETE: &str = "onGroupDelete";
pub const ON_GROUP_UPDATE: &str = "onGroupUpdate";
pub const ON_SCENE_CREATE: &str = "onSceneCreate";
pub const ON_SCENE_DELETE: &str = "onSceneDelete";
pub const ON_SCENE_UPDATE: &str = "onSceneUpdate";
pub const ON_CONTROL_CREATE: &str = "onControlCreate";
pub const ON_CONTROL_DELETE: &str = "onControlDelete";
pub const ON_CONTROL_UPDATE: &str = "onControlUpdate";
pub const GIVE_INPUT: &str = "giveInput";

/// Client-to-server method names, collected here so call sites never hand-type
/// a wire string twice.
pub mod client_to_server {
    pub const READY: &str = "ready";
    pub const SET_COMPRESSION: &str = "setCompression";
    pub const GET_TIME: &str = "getTime";
    pub const GET_MEMORY_STATS: &str = "getMemoryStats";
    pub const GET_THROTTLE_STATE: &str = "getThrottleState";
    pub const SET_BANDWIDTH_THROTTLE: &str = "setBandwidthThrottle";
    pub const GET_ALL_PARTICIPANTS: &str = "getAllParticipants";
    pub const GET_ACTIVE_PARTICIPANTS: &str = "getActiveParticipants";
    pub const UPDATE_PARTICIPANTS: &str = "updateParticipants";
    pub const CREATE_GROUPS: &str = "createGroups";
    pub const GET_GROUPS: &str = "getGroups";
    pub const UPDATE_GROUPS: &str = "updateGroups";
    pub const DELETE_GROUP: &str = "deleteGroup";
    pub const CREATE_SCENES: &str = "createScenes";
    pub const GET_SCENES: &str = "getScenes";
    pub const UPDATE_SCENES: &str = "updateScenes";
    pub const DELETE_SCENE: &str = "deleteScene";
    pub const CREATE_CONTROLS: &str = "createControls";
    pub const UPDATE_CONTROLS: &str = "updateControls";
    pub const DELETE_CONTROLS: &str = "deleteControls";
    pub const CAPTURE: &str = "capture";
}

/// A typed event handed to subscribers by the event dispatcher.
///
/// Every variant carries `request_id`, echoing the packet id of the method
/// packet that delivered it — useful for debugging, never for correlation
/// (§3 "Event").
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Hello { request_id: u64 },
    Ready { request_id: u64, params: Value },
    SetCompression { request_id: u64, scheme: String },
    IssueMemoryWarning { request_id: u64, params: Value },
    ParticipantJoin { request_id: u64, params: Value },
    ParticipantLeave { request_id: u64, params: Value },
    ParticipantUpdate { request_id: u64, params: Value },
    GroupCreate { request_id: u64, params: Value },
    GroupDelete { request_id: u64, params: Value },
    GroupUpdate { request_id: u64, params: Value },
    SceneCreate { request_id: u64, params: Value },
    SceneDelete { request_id: u64, params: Value },
    SceneUpdate { request_id: u64, params: Value },
    ControlCreate { request_id: u64, params: Value },
    ControlDelete { request_id: u64, params: Value },
    ControlUpdate { request_id: u64, params: Value },
    GiveInput { request_id: u64, params: Value },
    /// Locally synthesized by the connection controller (§4.F ambient
    /// addition); never delivered over the wire.
    ConnectionEstablished { candidate: String },
    /// Forward-compatibility catch-all for method names outside the closed
    /// set (§4.F, §7).
    Undefined {
        request_id: u64,
        method: String,
        params: Value,
    },
}

impl Event {
    /// Build the typed event for a given method name + params, following the
    /// closed mapping in §4.F. Falls back to `Undefined` for anything else.
    pub fn from_method(request_id: u64, method: &str, params: Value) -> Event {
        match method {
            HELLO => Event::Hello { request_id },
            ON_READY => Event::Ready { request_id, params },
            SET_COMPRESSION => {
                let scheme = params
                    .get("scheme")
                    .and_then(Value::as_str)
                    .unwrap_or("none")
                    .to_owned();
                Event::SetCompression { request_id, scheme }
            }
            ISSUE_MEMORY_WARNING => Event::IssueMemoryWarning { request_id, params },
            ON_PARTICIPANT_JOIN => Event::ParticipantJoin { request_id, params },
            ON_PARTICIPANT_LEAVE => Event::ParticipantLeave { request_id, params },
            ON_PARTICIPANT_UPDATE => Event::ParticipantUpdate { request_id, params },
            ON_GROUP_CREATE => Event::GroupCreate { request_id, params },
            ON_GROUP_DELETE => Event::GroupDelete { request_id, params },
            ON_GROUP_UPDATE => Event::GroupUpdate { request_id, params },
            ON_SCENE_CREATE => Event::SceneCreate { request_id, params },
            ON_SCENE_DELETE => Event::SceneDelete { request_id, params },
            ON_SCENE_UPDATE => Event::SceneUpdate { request_id, params },
            ON_CONTROL_CREATE => Event::ControlCreate { request_id, params },
            ON_CONTROL_DELETE => Event::ControlDelete { request_id, params },
            ON_CONTROL_UPDATE => Event::ControlUpdate { request_id, params },
            GIVE_INPUT => Event::GiveInput { request_id, params },
            other => Event::Undefined {
                request_id,
                method: other.to_owned(),
                params,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_maps_to_lifecycle_variant() {
        let ev = Event::from_method(1, HELLO, Value::Null);
        assert_eq!(ev, Event::Hello { request_id: 1 });
    }

    #[test]
    fn set_compression_extracts_scheme() {
        let ev = Event::from_method(2, SET_COMPRESSION, serde_json::json!({"scheme": "gzip"}));
        assert_eq!(
            ev,
            Event::SetCompression {
                request_id: 2,
                scheme: "gzip".to_owned()
            }
        );
    }

    #[test]
    fn unknown_method_name_becomes_undefined() {
        let ev = Event::from_method(42, "onNewThingThatDoesNotExist", serde_json::json!({"x": 1}));
        match ev {
            Event::Undefined { request_id, method, params } => {
                assert_eq!(request_id, 42);
                assert_eq!(method, "onNewThingThatDoesNotExist");
                assert_eq!(params["x"], 1);
            }
            other => panic!("expected Undefined, got {other:?}"),
        }
    }

    #[test]
    fn give_input_maps_to_control_event() {
        let ev = Event::from_method(5, GIVE_INPUT, serde_json::json!({"controlID": "btn1"}));
        assert!(matches!(ev, Event::GiveInput { request_id: 5, .. }));
    }
}
