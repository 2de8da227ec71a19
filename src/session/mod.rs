//! Client sessions.
//!
//! One [`Session`] task runs per connected client. It owns the client's
//! visibility, forwards hub notifications the client may see, and
//! dispatches the client's commands. The websocket plumbing around it lives
//! in `network::connection`; the session only sees queues.

pub mod access;
mod event_loop;

use std::sync::Arc;

use grid_proto::{ClientRequest, ServerMessage, User, UserId};
use tokio::sync::{broadcast, mpsc};

use crate::state::{Grid, SessionId};

pub use access::{AccessFilter, Visibility};
pub use event_loop::filter_notification;

/// One decoded client frame.
#[derive(Debug, Clone)]
pub enum Inbound {
    Request(ClientRequest),
    /// A frame that was not a valid request envelope.
    Malformed(String),
}

/// A connected client's actor.
pub struct Session {
    id: SessionId,
    user: UserId,
    is_admin: bool,
    grid: Arc<Grid>,
    inbound: mpsc::Receiver<Inbound>,
    outbound: mpsc::Sender<ServerMessage>,
    shutdown: broadcast::Receiver<()>,
}

impl Session {
    /// Wire up a session for `user`.
    ///
    /// Dropping every sender of `inbound` is the closing signal.
    pub fn new(
        grid: Arc<Grid>,
        id: SessionId,
        user: &User,
        inbound: mpsc::Receiver<Inbound>,
        outbound: mpsc::Sender<ServerMessage>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            id,
            user: user.user_id,
            is_admin: user.is_admin(),
            grid,
            inbound,
            outbound,
            shutdown,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }
}
