//! The WebSocket transport carrying the relay wire protocol (spec §6): a
//! persistent bidirectional JSON-object stream of [`ClientMessage`] /
//! [`ServerMessage`] frames.
//!
//! Structurally the same split-sink/split-stream wrapper this codebase's
//! other WebSocket client (the gateway's Discord proxy connection) already
//! uses, generalized from a single vendor payload type to the relay's own
//! envelope enum.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use happy_core::protocol::{ClientMessage, ServerMessage};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{SyncError, SyncResult};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// A live connection to the Relay Core.
pub(crate) struct RelayConnection {
    writer: SplitSink<WsStream, Message>,
    reader: SplitStream<WsStream>,
}

impl RelayConnection {
    /// Connects to `url` (a `ws://` or `wss://` relay endpoint).
    pub(crate) async fn connect(url: &str) -> SyncResult<Self> {
        let (ws, _response) = connect_async(url).await.map_err(|e| SyncError::Transport(e.to_string()))?;
        let (writer, reader) = ws.split();
        Ok(Self { writer, reader })
    }

    /// Sends one client message as a JSON text frame.
    pub(crate) async fn send(&mut self, message: &ClientMessage) -> SyncResult<()> {
        let json = serde_json::to_string(message)?;
        self.writer.send(Message::Text(json.into())).await.map_err(|e| SyncError::Transport(e.to_string()))
    }

    /// Receives the next server message, or `Ok(None)` on a clean close or
    /// any transport-level failure (both mean "this connection is dead,"
    /// which the reconnect loop treats identically).
    pub(crate) async fn recv(&mut self) -> SyncResult<Option<ServerMessage>> {
        loop {
            match self.reader.next().await {
                Some(Ok(Message::Text(text))) => {
                    let message: ServerMessage = serde_json::from_str(&text)?;
                    return Ok(Some(message));
                }
                Some(Ok(Message::Close(_))) => return Ok(None),
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Binary(_) | Message::Frame(_))) => {}
                Some(Err(_)) => return Ok(None),
                None => return Ok(None),
            }
        }
    }

    /// Closes the connection cleanly.
    pub(crate) async fn close(&mut self) {
        let _ = self.writer.close().await;
    }
}
