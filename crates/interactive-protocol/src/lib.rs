//! interactive-protocol: wire schema for the interactive-overlay session.
//!
//! Every frame on the duplex connection is a byte-wise encoding of a JSON
//! value: either a single packet object or an array of packet objects. This
//! crate owns the packet shapes, the closed set of recognized method names,
//! and the typed `Event` the dispatcher hands to subscribers. It does not
//! know about scenes, controls, groups, or participants as concrete types —
//! those bodies stay opaque `serde_json::Value` payloads, per spec.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub mod codec;
pub mod compression;
pub mod method_names;

pub use codec::{decode_frame, encode_frame, CodecError};
pub use compression::{CompressionError, Scheme};
pub use method_names::Event;

/// Discriminator carried on every packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacketKind {
    Method,
    Reply,
}

/// A structured service error attached to a reply packet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// One frame element: either a method invocation or a reply to one.
///
/// Serializes with a flat `type` tag (`"method"` / `"reply"`) rather than an
/// externally-tagged enum, because the wire format mixes type-tag discovery
/// with fields that are common across both kinds (`id`, `seq`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Packet {
    #[serde(rename = "type")]
    pub kind: PacketKind,
    pub id: u64,
    pub seq: u64,
    #[serde(flatten)]
    pub body: PacketBody,
}

/// The fields specific to a method packet vs. a reply packet.
///
/// `#[serde(flatten)]` on the parent lets this enum's variant fields sit
/// alongside `type`/`id`/`seq` in the same JSON object without a nested
/// wrapper key — matching the wire shape in §6 of the spec exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PacketBody {
    Method {
        method: String,
        #[serde(default)]
        params: Value,
        #[serde(default, skip_serializing_if = "is_false")]
        discard: bool,
    },
    Reply {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<ReplyError>,
    },
}

fn is_false(b: &bool) -> bool {
    !*b
}

impl Packet {
    /// Build a method packet bound for the wire.
    pub fn method(id: u64, seq: u64, method: impl Into<String>, params: Value, discard: bool) -> Self {
        Packet {
            kind: PacketKind::Method,
            id,
            seq,
            body: PacketBody::Method {
                method: method.into(),
                params,
                discard,
            },
        }
    }

    /// Build a successful reply packet.
    pub fn reply_ok(id: u64, seq: u64, result: Value) -> Self {
        Packet {
            kind: PacketKind::Reply,
            id,
            seq,
            body: PacketBody::Reply {
                result: Some(result),
                error: None,
            },
        }
    }

    /// Build an error reply packet.
    pub fn reply_err(id: u64, seq: u64, error: ReplyError) -> Self {
        Packet {
            kind: PacketKind::Reply,
            id,
            seq,
            body: PacketBody::Reply {
                result: None,
                error: Some(error),
            },
        }
    }

    /// `true` if this is a method packet with `discard = true` (no reply wanted).
    pub fn is_discard(&self) -> bool {
        matches!(&self.body, PacketBody::Method { discard: true, .. })
    }

    pub fn method_name(&self) -> Option<&str> {
        match &self.body {
            PacketBody::Method { method, .. } => Some(method.as_str()),
            PacketBody::Reply { .. } => None,
        }
    }
}
