//! A scripted mock interactive-overlay service for testing `interactive-client`.
//!
//! Mirrors the shape of a hand-rolled mock websocket server: bind to a
//! random port, accept one task per connection, send the `hello` event
//! immediately on connect, then dispatch every inbound method packet to a
//! caller-supplied handler and write back whatever packets it returns.
//!
//! Frames are always binary (compressed bytes need not be valid UTF-8); the
//! mock applies the same compression scheme swap the real service does when
//! a handler's reply to `setCompression` carries a new `scheme`, and it
//! applies it only to the *next* frame, never the one carrying the reply.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use interactive_protocol::{compression, decode_frame, encode_frame, Packet};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::Message;

/// Per-packet handler: given one inbound method packet, return the packets
/// to write back (zero or more — an empty vec means "send nothing", which is
/// how tests simulate a server that never replies, e.g. for timeout tests).
pub type Handler = Arc<dyn Fn(&Packet) -> Vec<Packet> + Send + Sync>;

fn scheme_from_tag(tag: u8) -> compression::Scheme {
    match tag {
        1 => compression::Scheme::Gzip,
        2 => compression::Scheme::Lz4,
        _ => compression::Scheme::None,
    }
}

fn tag_from_scheme(scheme: compression::Scheme) -> u8 {
    match scheme {
        compression::Scheme::None => 0,
        compression::Scheme::Gzip => 1,
        compression::Scheme::Lz4 => 2,
    }
}

/// A running mock service instance. Dropping it stops the accept loop.
pub struct MockInteractiveServer {
    addr: SocketAddr,
    _task: JoinHandle<()>,
}

impl MockInteractiveServer {
    /// Start the mock service on a random local port, with `handler` driving
    /// every non-discard method packet's reply.
    pub async fn start(handler: Handler) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let task = tokio::spawn(async move {
            Self::accept_loop(listener, handler).await;
        });
        Ok(Self { addr, _task: task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// The `ws://` URL clients should dial.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    async fn accept_loop(listener: TcpListener, handler: Handler) {
        loop {
            match listener.accept().await {
                Ok((stream, _peer)) => {
                    let handler = handler.clone();
                    tokio::spawn(async move {
                        let _ = Self::handle_connection(stream, handler).await;
                    });
                }
                Err(_) => break,
            }
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        handler: Handler,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let ws = tokio_tungstenite::accept_async(stream).await?;
        let (mut write, mut read) = ws.split();

        let scheme = Arc::new(AtomicU8::new(0));

        // hello is a server-initiated event: a discard method packet, seq 0.
        let hello = Packet::method(0, 0, "hello", serde_json::json!({}), true);
        let frame = write_frame(scheme_from_tag(scheme.load(Ordering::SeqCst)), &[hello])?;
        write.send(Message::Binary(frame)).await?;

        let mut next_seq: u64 = 1;

        while let Some(msg) = read.next().await {
            let msg = msg?;
            let bytes = match msg {
                Message::Binary(b) => b,
                Message::Text(t) => t.into_bytes(),
                Message::Close(_) => break,
                Message::Ping(d) => {
                    write.send(Message::Pong(d)).await?;
                    continue;
                }
                _ => continue,
            };

            let current_scheme = scheme_from_tag(scheme.load(Ordering::SeqCst));
            let raw = compression::decode(current_scheme, &bytes)?;
            let packets = decode_frame(&raw)?;

            let mut outgoing = Vec::new();
            let mut pending_scheme_switch: Option<compression::Scheme> = None;

            for packet in &packets {
                let replies = handler(packet);
                if packet.method_name() == Some("setCompression") {
                    for reply in &replies {
                        if let Some(new_scheme) = extract_negotiated_scheme(reply) {
                            pending_scheme_switch = Some(new_scheme);
                        }
                    }
                }
                for mut reply in replies {
                    reply.seq = next_seq;
                    next_seq += 1;
                    outgoing.push(reply);
                }
            }

            if !outgoing.is_empty() {
                let frame = write_frame(current_scheme, &outgoing)?;
                write.send(Message::Binary(frame)).await?;
            }

            // Per §4.D / invariant 4: the new scheme applies starting with the
            // *next* frame, never the one carrying the negotiation reply.
            if let Some(new_scheme) = pending_scheme_switch {
                scheme.store(tag_from_scheme(new_scheme), Ordering::SeqCst);
            }
        }

        Ok(())
    }
}

fn write_frame(
    scheme: compression::Scheme,
    packets: &[Packet],
) -> Result<Vec<u8>, Box<dyn std::error::Error + Send + Sync>> {
    let raw = encode_frame(packets)?;
    Ok(compression::encode(scheme, &raw)?)
}

fn extract_negotiated_scheme(reply: &Packet) -> Option<compression::Scheme> {
    if let interactive_protocol::PacketBody::Reply { result: Some(result), .. } = &reply.body {
        let name = result.get("scheme")?.as_str()?;
        return Some(compression::Scheme::from_name(name));
    }
    None
}
