//! Packet codec: JSON byte frames <-> `Packet` lists.
//!
//! The service may send either a single packet object or a JSON array of
//! packet objects in one frame. `decode_frame` normalizes both shapes to a
//! `Vec<Packet>`; `encode_frame` always emits a JSON array, which every
//! server implementation observed in the wild accepts even for a single
//! packet.

use crate::Packet;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("frame was not a JSON object or array")]
    NotAnObjectOrArray,
}

/// Decode a raw frame payload into zero or more packets.
///
/// `PacketKind` only recognizes `"method"` and `"reply"`, so an element
/// carrying any other `type` fails the strict `Packet` deserialization. Per
/// §4.A this must not reject the frame: such an element is instead decoded
/// as an opaque method packet (`as_undefined_packet`) whose method name is
/// the unrecognized `type` string, so it flows through the same "unknown
/// method name" path as any other forward-compatible event (see
/// `method_names::Event::from_method`). `CodecError` is only returned when
/// the bytes aren't valid JSON, or an object with a recognized `type` still
/// fails to parse (a genuinely malformed packet).
pub fn decode_frame(bytes: &[u8]) -> Result<Vec<Packet>, CodecError> {
    let value: Value = serde_json::from_slice(bytes)?;
    match value {
        Value::Array(items) => items.into_iter().map(decode_one).collect(),
        Value::Object(_) => Ok(vec![decode_one(value)?]),
        _ => Err(CodecError::NotAnObjectOrArray),
    }
}

fn decode_one(item: Value) -> Result<Packet, CodecError> {
    match serde_json::from_value::<Packet>(item.clone()) {
        Ok(packet) => Ok(packet),
        Err(e) => as_undefined_packet(&item).ok_or_else(|| CodecError::from(e)),
    }
}

/// Builds a synthetic method packet for an element whose `type` tag isn't
/// `"method"` or `"reply"`. Returns `None` when the element isn't even an
/// object with a `type` field, or when `type` *is* recognized (so the
/// original parse failure was a real malformed-packet error, not forward
/// compatibility).
fn as_undefined_packet(item: &Value) -> Option<Packet> {
    let obj = item.as_object()?;
    let kind = obj.get("type").and_then(Value::as_str)?;
    if kind == "method" || kind == "reply" {
        return None;
    }
    let id = obj.get("id").and_then(Value::as_u64).unwrap_or(0);
    let seq = obj.get("seq").and_then(Value::as_u64).unwrap_or(0);
    Some(Packet::method(id, seq, kind.to_owned(), item.clone(), false))
}

/// Encode one or more packets into a single wire frame (always a JSON array).
pub fn encode_frame(packets: &[Packet]) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(packets)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PacketBody;

    #[test]
    fn decode_single_object_frame() {
        let raw = br#"{"type":"method","id":0,"seq":0,"method":"getTime","params":{}}"#;
        let packets = decode_frame(raw).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].method_name(), Some("getTime"));
    }

    #[test]
    fn decode_array_frame_preserves_order() {
        let raw = br#"[
            {"type":"reply","id":0,"seq":1,"result":{"time":1}},
            {"type":"reply","id":1,"seq":2,"result":{"time":2}}
        ]"#;
        let packets = decode_frame(raw).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].id, 0);
        assert_eq!(packets[1].id, 1);
    }

    #[test]
    fn encode_always_emits_an_array() {
        let p = Packet::method(3, 0, "ready", serde_json::json!({"isReady": true}), false);
        let bytes = encode_frame(std::slice::from_ref(&p)).unwrap();
        let value: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(value.is_array());
    }

    #[test]
    fn round_trip_through_encode_then_decode() {
        let p = Packet::reply_ok(12, 4, serde_json::json!({"ok": true}));
        let bytes = encode_frame(std::slice::from_ref(&p)).unwrap();
        let decoded = decode_frame(&bytes).unwrap();
        assert_eq!(decoded, vec![p]);
    }

    #[test]
    fn malformed_json_is_rejected() {
        let err = decode_frame(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Malformed(_)));
    }

    #[test]
    fn unrecognized_type_tag_decodes_as_an_opaque_packet_instead_of_failing() {
        let raw = br#"[
            {"type":"reply","id":0,"seq":1,"result":{"time":1}},
            {"type":"ping","id":9,"seq":2,"nonce":7}
        ]"#;
        let packets = decode_frame(raw).unwrap();
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].id, 0);
        assert_eq!(packets[1].method_name(), Some("ping"));
        assert_eq!(packets[1].id, 9);
        assert_eq!(packets[1].seq, 2);
    }

    #[test]
    fn unrecognized_method_name_is_not_a_codec_error() {
        // Forward-compatibility: an unknown *method name* parses fine at the
        // codec layer. Only the event dispatcher decides it is "undefined".
        let raw = br#"{"type":"method","id":42,"seq":7,"method":"onNewThingThatDoesNotExist","params":{"x":1}}"#;
        let packets = decode_frame(raw).unwrap();
        assert_eq!(packets.len(), 1);
        match &packets[0].body {
            PacketBody::Method { method, params, .. } => {
                assert_eq!(method, "onNewThingThatDoesNotExist");
                assert_eq!(params["x"], 1);
            }
            other => panic!("unexpected body: {other:?}"),
        }
    }
}
