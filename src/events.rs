//! Event dispatcher (§4.F): maps inbound method names to typed `Event`
//! variants, tracks the last-seen sequence number, and fans out to
//! subscribers over a broadcast channel (mirrors `services/receiver`'s
//! `event_tx: tokio::sync::broadcast::Sender<ReadEvent>`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::broadcast;

pub use interactive_protocol::Event;

const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// A subscriber's view of the event bus. Wraps a `broadcast::Receiver` with
/// one replayed event ahead of it, so a subscriber that attaches after a
/// one-shot notification was raised still observes it exactly once instead
/// of missing it to `tokio::sync::broadcast`'s no-receiver-no-delivery rule.
pub struct EventStream {
    replay: Option<Event>,
    inner: broadcast::Receiver<Event>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        if let Some(event) = self.replay.take() {
            return Ok(event);
        }
        self.inner.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Event, broadcast::error::TryRecvError> {
        if let Some(event) = self.replay.take() {
            return Ok(event);
        }
        self.inner.try_recv()
    }
}

/// Owns the subscriber registry and the sequence-number counter (§3
/// "Ownership"). Batch-level sorting by `seq` happens in the transport's
/// reader loop, which has the whole frame available; this type only
/// tracks the high-water mark and fans out one event at a time.
pub struct EventDispatcher {
    tx: broadcast::Sender<Event>,
    last_seq: AtomicU64,
    established: Mutex<Option<Event>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY);
        EventDispatcher {
            tx,
            last_seq: AtomicU64::new(0),
            established: Mutex::new(None),
        }
    }

    /// Subscribe to the event stream. A lagging subscriber only loses its
    /// own backlog (`RecvError::Lagged`); it never blocks or drops other
    /// subscribers (§4.F "a subscriber failure does not prevent other
    /// subscribers from receiving"). Every subscriber also gets a replay of
    /// the connection-established notification if one was already raised.
    pub fn subscribe(&self) -> EventStream {
        EventStream {
            replay: self.established.lock().unwrap().clone(),
            inner: self.tx.subscribe(),
        }
    }

    /// Build the typed event for one inbound method packet and publish it.
    /// Called once per packet, in the order the caller wants delivered
    /// (the transport sorts a batch by `seq` before calling this per-packet).
    pub fn dispatch(&self, request_id: u64, seq: u64, method: &str, params: Value) {
        self.last_seq.fetch_max(seq, Ordering::SeqCst);
        let event = Event::from_method(request_id, method, params);
        // No subscribers is not an error; it just means nobody is listening yet.
        let _ = self.tx.send(event);
    }

    /// Record the connection-established notification (§4.G step 3). There
    /// is no guaranteed subscriber at the instant a connect attempt
    /// succeeds — the facade can only subscribe once `connect` returns — so
    /// this bypasses the live broadcast bus entirely and is handed to each
    /// subscriber as a one-time replay by `subscribe`, guaranteeing it is
    /// observed exactly once no matter when a host subscribes.
    pub fn set_established(&self, event: Event) {
        *self.established.lock().unwrap() = Some(event);
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq.load(Ordering::SeqCst)
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_tracks_high_water_mark() {
        let d = EventDispatcher::new();
        let mut rx = d.subscribe();
        d.dispatch(1, 5, "onReady", serde_json::json!({}));
        d.dispatch(2, 3, "onReady", serde_json::json!({}));
        assert_eq!(d.last_seq(), 5);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_ok());
    }

    #[test]
    fn unknown_method_reaches_subscriber_as_undefined() {
        let d = EventDispatcher::new();
        let mut rx = d.subscribe();
        d.dispatch(1, 1, "onSomethingNew", serde_json::json!({"x": 1}));
        match rx.try_recv().unwrap() {
            Event::Undefined { method, .. } => assert_eq!(method, "onSomethingNew"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn established_is_replayed_to_a_subscriber_that_attaches_afterward() {
        let d = EventDispatcher::new();
        d.set_established(Event::ConnectionEstablished { candidate: "wss://host-a".to_owned() });

        // Subscribing only *after* the event was raised still sees it —
        // a plain `tx.send` at `set_established` time would have had no
        // receiver and silently dropped it.
        let mut rx = d.subscribe();
        match rx.try_recv().unwrap() {
            Event::ConnectionEstablished { candidate } => assert_eq!(candidate, "wss://host-a"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)));
    }

    #[test]
    fn each_subscriber_gets_its_own_replay() {
        let d = EventDispatcher::new();
        d.set_established(Event::ConnectionEstablished { candidate: "wss://host-a".to_owned() });

        let mut first = d.subscribe();
        let mut second = d.subscribe();
        assert!(matches!(first.try_recv(), Ok(Event::ConnectionEstablished { .. })));
        assert!(matches!(second.try_recv(), Ok(Event::ConnectionEstablished { .. })));
    }
}
