//! RPC engine (§4.E): packet-id allocation, pending-request correlation,
//! per-request timeout, and handoff of unmatched inbound method packets to
//! the event dispatcher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;

use interactive_protocol::{Packet, PacketBody, ReplyError as WireReplyError};

use crate::error::{InteractiveError, ReplyError};
use crate::events::EventDispatcher;
use crate::transport::Transport;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// The outcome a pending request's completion sink carries.
enum CallOutcome {
    Ok(Value),
    Err(WireReplyError),
    TransportClosed,
}

struct PendingRequest {
    method: String,
    tx: oneshot::Sender<CallOutcome>,
}

/// Owns the packet-id counter and the pending-request table (§3 "Ownership").
pub struct RpcEngine {
    next_id: AtomicU64,
    next_seq: AtomicU64,
    pending: Mutex<HashMap<u64, PendingRequest>>,
}

impl RpcEngine {
    pub fn new() -> Self {
        RpcEngine {
            next_id: AtomicU64::new(0),
            next_seq: AtomicU64::new(0),
            pending: Mutex::new(HashMap::new()),
        }
    }

    fn claim_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn claim_seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a method packet and await its reply, subject to the 15s request
    /// timeout. Installs the pending record before handing the frame to the
    /// transport so a pathologically fast reply can never race registration
    /// (Open Question 2).
    pub async fn call(
        &self,
        transport: &Transport,
        method: &str,
        params: Value,
    ) -> Result<Value, InteractiveError> {
        let id = self.claim_id();
        let seq = self.claim_seq();
        let (tx, mut rx) = oneshot::channel();

        self.pending.lock().unwrap().insert(
            id,
            PendingRequest {
                method: method.to_owned(),
                tx,
            },
        );

        let packet = Packet::method(id, seq, method, params, false);
        // A send failure is treated as equivalent to a reply never arriving
        // (§4.E): we still race the timeout/close paths below rather than
        // failing the call immediately.
        let _ = transport.send_packet(&packet).await;

        let outcome = tokio::select! {
            res = &mut rx => res.unwrap_or(CallOutcome::TransportClosed),
            () = tokio::time::sleep(REQUEST_TIMEOUT) => {
                let claimed = self.pending.lock().unwrap().remove(&id).is_some();
                if claimed {
                    return Err(InteractiveError::ReplyTimeout { method: method.to_owned() });
                }
                // Someone else already resolved and removed the entry; the
                // value is already in flight on `rx`.
                rx.await.unwrap_or(CallOutcome::TransportClosed)
            }
        };

        match outcome {
            CallOutcome::Ok(result) => Ok(result),
            CallOutcome::Err(err) => Err(InteractiveError::ReplyWithError(ReplyError {
                method: method.to_owned(),
                code: err.code,
                message: err.message,
                path: err.path,
            })),
            CallOutcome::TransportClosed => Err(InteractiveError::TransportClosed {
                method: method.to_owned(),
            }),
        }
    }

    /// Fire-and-forget method packet; never installs a pending record and
    /// never reports a result.
    pub async fn notify(&self, transport: &Transport, method: &str, params: Value) {
        let id = self.claim_id();
        let seq = self.claim_seq();
        let packet = Packet::method(id, seq, method, params, true);
        let _ = transport.send_packet(&packet).await;
    }

    /// Invoked by the transport's reader loop for every inbound packet.
    /// Replies resolve a matching pending record if one exists (an
    /// unmatched reply is ignored — best effort, never fatal); method
    /// packets are forwarded to the dispatcher.
    pub fn deliver(&self, packet: Packet, dispatcher: &EventDispatcher) {
        match packet.body {
            PacketBody::Reply { result, error } => {
                let pending = self.pending.lock().unwrap().remove(&packet.id);
                match pending {
                    Some(p) => {
                        let outcome = match error {
                            Some(e) => CallOutcome::Err(e),
                            None => CallOutcome::Ok(result.unwrap_or(Value::Null)),
                        };
                        let _ = p.tx.send(outcome);
                    }
                    None => {
                        tracing::debug!(packet_id = packet.id, "reply with no pending request, ignored");
                    }
                }
            }
            PacketBody::Method { method, params, discard: _ } => {
                dispatcher.dispatch(packet.id, packet.seq, &method, params);
            }
        }
    }

    /// Fail every outstanding pending request with `TransportClosed`.
    /// Called once by the transport when the connection terminates.
    pub fn fail_all_pending(&self) {
        let mut pending = self.pending.lock().unwrap();
        for (_, req) in pending.drain() {
            let _ = req.tx.send(CallOutcome::TransportClosed);
            tracing::debug!(method = %req.method, "pending request failed by transport close");
        }
    }
}

impl Default for RpcEngine {
    fn default() -> Self {
        Self::new()
    }
}
