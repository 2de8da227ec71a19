//! Command handler context and core types.
//!
//! A [`Context`] is owned and cheap to clone, so a handler can run on its
//! own task long after the session loop moved on. Results sent through a
//! context whose session has ended are dropped.

use std::sync::Arc;

use async_trait::async_trait;
use grid_proto::{ClientRequest, ServerMessage, UserId};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{HandlerError, HandlerResult};
use crate::hostops::Console;
use crate::session::Visibility;
use crate::state::{Grid, SessionId};

/// Handler context passed to each command handler.
#[derive(Clone)]
pub struct Context {
    /// The session the command arrived on.
    pub session: SessionId,
    /// The authenticated user.
    pub user: UserId,
    /// Whether the user is an administrator.
    pub is_admin: bool,
    /// Shared services.
    pub grid: Arc<Grid>,
    /// Queue towards this client.
    pub sender: Outbound,
    /// This session's open console, if any.
    pub console: ConsoleSlot,
}

impl Context {
    /// Fail with "Permission Denied" unless the user is an administrator.
    pub fn require_admin(&self) -> Result<(), HandlerError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(HandlerError::PermissionDenied)
        }
    }

    /// Push one message to the client.
    pub async fn push(&self, msg: ServerMessage) {
        self.sender.send(msg).await;
    }

    /// Send the single completion signal for request `message_id`.
    pub async fn signal(&self, message_id: i64, result: HandlerResult) {
        let msg = match result {
            Ok(text) => ServerMessage::success(message_id, text),
            Err(e) => ServerMessage::error(message_id, e.to_string()),
        };
        self.sender.send(msg).await;
    }
}

/// Sending half of a session's outbound queue.
#[derive(Clone)]
pub struct Outbound {
    tx: mpsc::Sender<ServerMessage>,
}

impl Outbound {
    pub fn new(tx: mpsc::Sender<ServerMessage>) -> Self {
        Self { tx }
    }

    /// Queue a message. Returns false once the client is gone.
    pub async fn send(&self, msg: ServerMessage) -> bool {
        match self.tx.send(msg).await {
            Ok(()) => true,
            Err(mpsc::error::SendError(msg)) => {
                debug!(message_type = msg.message_type(), "dropping message for closed session");
                false
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Holder for the console a session has open.
#[derive(Clone, Default)]
pub struct ConsoleSlot {
    inner: Arc<Mutex<Option<Box<dyn Console>>>>,
}

impl ConsoleSlot {
    /// Install a console, handing back the one it displaced.
    pub fn replace(&self, console: Box<dyn Console>) -> Option<Box<dyn Console>> {
        self.inner.lock().replace(console)
    }

    pub fn take(&self) -> Option<Box<dyn Console>> {
        self.inner.lock().take()
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().is_some()
    }
}

/// A command that runs on its own task.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &Context, req: &ClientRequest) -> HandlerResult;
}

/// A command that runs on the session loop and may read its visibility.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &Context,
        visibility: &Visibility,
        req: &ClientRequest,
    ) -> HandlerResult;
}
