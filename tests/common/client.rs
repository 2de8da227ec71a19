//! Test WebSocket client.
//!
//! Sends command envelopes and decodes pushed [`ServerMessage`]s.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use grid_proto::ServerMessage;
use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// A test client.
pub struct TestClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    next_id: i64,
}

impl TestClient {
    /// Connect with `?token=`.
    pub async fn connect(addr: SocketAddr, token: &str) -> anyhow::Result<Self> {
        let (ws, _) = connect_async(format!("ws://{addr}/?token={token}")).await?;
        Ok(Self { ws, next_id: 1 })
    }

    /// Send a raw text frame.
    #[allow(dead_code)]
    pub async fn send_raw(&mut self, text: &str) -> anyhow::Result<()> {
        self.ws.send(Message::Text(text.to_string())).await?;
        Ok(())
    }

    /// Send a command and return its message id.
    pub async fn send(
        &mut self,
        message_type: &str,
        body: serde_json::Value,
    ) -> anyhow::Result<i64> {
        let id = self.next_id;
        self.next_id += 1;
        let envelope = json!({"MessageID": id, "MessageType": message_type, "Message": body});
        self.send_raw(&envelope.to_string()).await?;
        Ok(id)
    }

    /// Receive a single message from the server.
    pub async fn recv(&mut self) -> anyhow::Result<ServerMessage> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a message with a timeout.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<ServerMessage> {
        loop {
            let frame = timeout(dur, self.ws.next())
                .await?
                .ok_or_else(|| anyhow::anyhow!("connection closed"))??;
            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => anyhow::bail!("connection closed"),
                _ => continue,
            }
        }
    }

    /// Receive messages up to and including the signal for `message_id`.
    pub async fn recv_until_signal(
        &mut self,
        message_id: i64,
    ) -> anyhow::Result<Vec<ServerMessage>> {
        let mut messages = Vec::new();
        loop {
            let msg = self.recv().await?;
            let done = matches!(
                &msg,
                ServerMessage::Success(s) | ServerMessage::Error(s) if s.message_id == message_id
            );
            messages.push(msg);
            if done {
                return Ok(messages);
            }
        }
    }

    /// Send a command and wait for its signal. Returns the pushes before it
    /// and the signal itself.
    pub async fn request(
        &mut self,
        message_type: &str,
        body: serde_json::Value,
    ) -> anyhow::Result<(Vec<ServerMessage>, ServerMessage)> {
        let id = self.send(message_type, body).await?;
        let mut messages = self.recv_until_signal(id).await?;
        let signal = messages
            .pop()
            .ok_or_else(|| anyhow::anyhow!("no signal"))?;
        Ok((messages, signal))
    }

    /// Drain whatever arrives within `dur`.
    #[allow(dead_code)]
    pub async fn drain(&mut self, dur: Duration) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.recv_timeout(dur).await {
            messages.push(msg);
        }
        messages
    }

    #[allow(dead_code)]
    pub async fn close(mut self) -> anyhow::Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
