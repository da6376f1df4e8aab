//! A thin websocket client for tests that need to drive a connection
//! manually (raw packet send/recv, custom auth headers, deliberately
//! malformed frames) rather than going through the full session client.

use futures_util::{SinkExt, StreamExt};
use interactive_protocol::{compression, decode_frame, encode_frame, Packet};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::MaybeTlsStream;

type WsStream = tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

pub struct MockClient {
    write: futures_util::stream::SplitSink<WsStream, Message>,
    read: futures_util::stream::SplitStream<WsStream>,
    scheme: compression::Scheme,
}

impl MockClient {
    pub async fn connect(url: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let (ws, _response) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws.split();
        Ok(Self {
            write,
            read,
            scheme: compression::Scheme::None,
        })
    }

    /// Switch the scheme this client uses to encode/decode subsequent frames.
    pub fn set_scheme(&mut self, scheme: compression::Scheme) {
        self.scheme = scheme;
    }

    pub async fn send_packets(&mut self, packets: &[Packet]) -> Result<(), Box<dyn std::error::Error>> {
        let raw = encode_frame(packets)?;
        let compressed = compression::encode(self.scheme, &raw)?;
        self.write.send(Message::Binary(compressed)).await?;
        Ok(())
    }

    pub async fn recv_packets(&mut self) -> Result<Vec<Packet>, Box<dyn std::error::Error>> {
        loop {
            match self.read.next().await {
                Some(Ok(Message::Binary(bytes))) => {
                    let raw = compression::decode(self.scheme, &bytes)?;
                    return Ok(decode_frame(&raw)?);
                }
                Some(Ok(Message::Text(text))) => {
                    let raw = compression::decode(self.scheme, text.as_bytes())?;
                    return Ok(decode_frame(&raw)?);
                }
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Ok(Message::Close(_))) | None => return Err("connection closed".into()),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }
}
