//! Session transport (§4.D): one duplex websocket connection, the
//! {Dialing, Open, Closing, Closed} state machine, and the only component
//! permitted to mutate the compression scheme.
//!
//! Header construction is grounded on `services/forwarder/src/uplink.rs`'s
//! `IntoClientRequest` + `HeaderValue::from_str` pattern for attaching a
//! bearer token to the opening handshake.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::{oneshot, Mutex, RwLock};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

use interactive_protocol::{compression, decode_frame, encode_frame, method_names, Packet, PacketBody, Scheme};

use crate::config::ClientConfig;
use crate::error::{ConfigError, InteractiveError};
use crate::events::EventDispatcher;
use crate::rpc::RpcEngine;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Dialing,
    Open,
    Closing,
    Closed,
}

fn scheme_from_tag(tag: u8) -> Scheme {
    match tag {
        1 => Scheme::Gzip,
        2 => Scheme::Lz4,
        _ => Scheme::None,
    }
}

fn tag_from_scheme(scheme: Scheme) -> u8 {
    match scheme {
        Scheme::None => 0,
        Scheme::Gzip => 1,
        Scheme::Lz4 => 2,
    }
}

fn header_value(value: &str) -> Result<HeaderValue, ConfigError> {
    HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidHeaderValue(e.to_string()))
}

fn build_request(
    url: &str,
    config: &ClientConfig,
) -> Result<tokio_tungstenite::tungstenite::handshake::client::Request, InteractiveError> {
    let mut request = url.into_client_request()?;
    let headers = request.headers_mut();
    headers.insert("X-Protocol-Version", HeaderValue::from_static("2.0"));
    headers.insert(
        "X-Interactive-Version",
        header_value(&config.version_id.to_string())?,
    );
    if let Some(code) = &config.share_code {
        headers.insert("X-Interactive-Sharecode", header_value(code)?);
    }
    headers.insert("Authorization", header_value(&config.auth_header_value())?);
    Ok(request)
}

/// One duplex connection. The reader task lives inside `connect` and holds
/// its own `Arc` clone; the transport is otherwise driven by callers of
/// `send_packet`/`close`.
pub struct Transport {
    write: Mutex<futures_util::stream::SplitSink<WsStream, Message>>,
    scheme: AtomicU8,
    state: RwLock<SessionState>,
    engine: Arc<RpcEngine>,
    dispatcher: Arc<EventDispatcher>,
}

impl Transport {
    /// Dial `url`, install the handshake ceiling, and return once `hello`
    /// has been observed (success) or the connection failed/closed/timed
    /// out before then (failure).
    pub async fn connect(
        url: &str,
        config: &ClientConfig,
        engine: Arc<RpcEngine>,
        dispatcher: Arc<EventDispatcher>,
    ) -> Result<Arc<Transport>, InteractiveError> {
        let request = build_request(url, config)?;
        let (ws, _response) = tokio_tungstenite::connect_async(request).await?;
        let (write, read) = ws.split();

        let transport = Arc::new(Transport {
            write: Mutex::new(write),
            scheme: AtomicU8::new(0),
            state: RwLock::new(SessionState::Dialing),
            engine,
            dispatcher,
        });

        let (handshake_tx, handshake_rx) = oneshot::channel();
        let reader = transport.clone();
        tokio::spawn(async move {
            reader.read_loop(read, handshake_tx).await;
        });

        match tokio::time::timeout(HANDSHAKE_TIMEOUT, handshake_rx).await {
            Ok(Ok(Ok(()))) => Ok(transport),
            Ok(Ok(Err(e))) => Err(e),
            Ok(Err(_canceled)) => Err(InteractiveError::TransportClosed {
                method: method_names::HELLO.to_owned(),
            }),
            Err(_elapsed) => Err(InteractiveError::ReplyTimeout {
                method: method_names::HELLO.to_owned(),
            }),
        }
    }

    async fn read_loop(
        self: Arc<Self>,
        mut read: futures_util::stream::SplitStream<WsStream>,
        mut handshake_tx: Option<oneshot::Sender<Result<(), InteractiveError>>>,
    ) {
        while let Some(msg) = read.next().await {
            let bytes = match msg {
                Ok(Message::Binary(b)) => b,
                Ok(Message::Text(t)) => t.into_bytes(),
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => continue,
            };

            let scheme = scheme_from_tag(self.scheme.load(Ordering::SeqCst));
            let raw = match compression::decode(scheme, &bytes) {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decompress inbound frame, dropping");
                    continue;
                }
            };
            let mut packets = match decode_frame(&raw) {
                Ok(packets) => packets,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to decode inbound frame, dropping");
                    continue;
                }
            };
            // Invariant 3: events within one batch are delivered in
            // ascending seq order.
            packets.sort_by_key(|p| p.seq);

            let mut pending_scheme_switch: Option<Scheme> = None;
            for packet in packets {
                if let PacketBody::Method { params, .. } = &packet.body {
                    if packet.method_name() == Some(method_names::SET_COMPRESSION) {
                        if let Some(name) = params.get("scheme").and_then(serde_json::Value::as_str) {
                            pending_scheme_switch = Some(Scheme::from_name(name));
                        }
                    }
                }
                let is_hello = packet.method_name() == Some(method_names::HELLO);
                self.engine.deliver(packet, &self.dispatcher);
                if is_hello {
                    *self.state.write().await = SessionState::Open;
                    if let Some(tx) = handshake_tx.take() {
                        let _ = tx.send(Ok(()));
                    }
                }
            }

            // §4.D / invariant 4: the new scheme applies starting with the
            // next frame, never the one carrying the setCompression event.
            if let Some(scheme) = pending_scheme_switch {
                self.set_scheme(scheme);
            }
        }

        *self.state.write().await = SessionState::Closed;
        self.engine.fail_all_pending();
        if let Some(tx) = handshake_tx.take() {
            let _ = tx.send(Err(InteractiveError::TransportClosed {
                method: method_names::HELLO.to_owned(),
            }));
        }
    }

    pub async fn send_packet(&self, packet: &Packet) -> Result<(), InteractiveError> {
        let raw = encode_frame(std::slice::from_ref(packet))?;
        let scheme = self.current_scheme();
        let compressed = compression::encode(scheme, &raw)?;
        let mut write = self.write.lock().await;
        write.send(Message::Binary(compressed)).await?;
        Ok(())
    }

    pub fn current_scheme(&self) -> Scheme {
        scheme_from_tag(self.scheme.load(Ordering::SeqCst))
    }

    /// The only place the compression scheme is mutated (§4.D).
    pub fn set_scheme(&self, scheme: Scheme) {
        self.scheme.store(tag_from_scheme(scheme), Ordering::SeqCst);
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    /// Local or remote close: fails every pending call with
    /// `TransportClosed` (§5, cancellation point (a)).
    pub async fn close(&self) {
        *self.state.write().await = SessionState::Closing;
        {
            let mut write = self.write.lock().await;
            let _ = write.send(Message::Close(None)).await;
        }
        *self.state.write().await = SessionState::Closed;
        self.engine.fail_all_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_tag_round_trips() {
        for s in [Scheme::None, Scheme::Gzip, Scheme::Lz4] {
            assert_eq!(scheme_from_tag(tag_from_scheme(s)), s);
        }
    }
}
