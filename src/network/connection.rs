//! Per-client WebSocket plumbing.
//!
//! A reader task turns frames into [`Inbound`] values on the session's
//! bounded inbound queue, and a writer task drains the outbound queue onto
//! the socket. The session in between never touches the socket. The reader
//! dropping its sender is the session's closing signal.

use crate::session::{Inbound, Session};
use crate::state::Grid;
use futures_util::{SinkExt, StreamExt};
use grid_proto::{ClientRequest, ServerMessage, User};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Run a session over an accepted WebSocket until it ends.
pub async fn serve<S>(
    ws: WebSocketStream<S>,
    addr: SocketAddr,
    user: User,
    grid: Arc<Grid>,
    shutdown: broadcast::Receiver<()>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let id = grid
        .sessions
        .register(user.user_id, user.is_admin(), Some(addr));
    let (inbound_tx, inbound_rx) = mpsc::channel(grid.limits.inbound_capacity.max(1));
    let (outbound_tx, outbound_rx) = mpsc::channel(grid.limits.outbound_capacity.max(1));
    let (sink, stream) = ws.split();

    let reader = tokio::spawn(read_frames(stream, inbound_tx));
    tokio::spawn(write_frames(sink, outbound_rx));

    Session::new(grid, id, &user, inbound_rx, outbound_tx, shutdown)
        .run()
        .await;

    // On shutdown the client may still be connected.
    reader.abort();
}

/// Decode one text frame.
pub(crate) fn decode_frame(text: &str) -> Inbound {
    match ClientRequest::parse(text) {
        Ok(req) => Inbound::Request(req),
        Err(e) => Inbound::Malformed(e.to_string()),
    }
}

async fn read_frames<R>(mut stream: R, inbound: mpsc::Sender<Inbound>)
where
    R: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>>
        + Unpin,
{
    while let Some(frame) = stream.next().await {
        let inbound_msg = match frame {
            Ok(Message::Text(text)) => decode_frame(&text),
            Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                Ok(text) => decode_frame(text),
                Err(e) => Inbound::Malformed(e.to_string()),
            },
            Ok(Message::Close(_)) => break,
            // Pings are answered by tungstenite on the next write.
            Ok(_) => continue,
            Err(e) => {
                debug!(error = %e, "WebSocket read failed");
                break;
            }
        };
        if inbound.send(inbound_msg).await.is_err() {
            break;
        }
    }
}

async fn write_frames<W>(mut sink: W, mut outbound: mpsc::Receiver<ServerMessage>)
where
    W: futures_util::Sink<Message, Error = tokio_tungstenite::tungstenite::Error> + Unpin,
{
    while let Some(msg) = outbound.recv().await {
        let text = match msg.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, message_type = msg.message_type(), "failed to encode push");
                continue;
            }
        };
        if let Err(e) = sink.send(Message::Text(text)).await {
            debug!(error = %e, "WebSocket write failed");
            break;
        }
    }
    let _ = sink.close().await;
}
