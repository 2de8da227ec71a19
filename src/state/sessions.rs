//! Live session registry.
//!
//! Sessions register on connect and report their exit on the closing sink;
//! [`SessionRegistry::run_cleanup`] drains that sink and forgets them.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use grid_proto::UserId;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Process-unique session id.
pub type SessionId = u64;

/// Closing notification emitted by a session as it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionClosed {
    pub session: SessionId,
    pub user: UserId,
}

/// What the registry knows about a live session.
#[derive(Debug, Clone)]
pub struct SessionEntry {
    pub user: UserId,
    pub admin: bool,
    pub addr: Option<SocketAddr>,
    pub connected_at: DateTime<Utc>,
}

struct Inner {
    sessions: DashMap<SessionId, SessionEntry>,
    next_id: AtomicU64,
    closing: mpsc::Sender<SessionClosed>,
}

#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<Inner>,
}

impl SessionRegistry {
    /// Create a registry and the receiving end of its closing sink.
    pub fn new() -> (Self, mpsc::Receiver<SessionClosed>) {
        let (closing, rx) = mpsc::channel(64);
        let registry = Self {
            inner: Arc::new(Inner {
                sessions: DashMap::new(),
                next_id: AtomicU64::new(1),
                closing,
            }),
        };
        (registry, rx)
    }

    pub fn register(&self, user: UserId, admin: bool, addr: Option<SocketAddr>) -> SessionId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.sessions.insert(
            id,
            SessionEntry {
                user,
                admin,
                addr,
                connected_at: Utc::now(),
            },
        );
        if let Some(m) = crate::metrics::ACTIVE_SESSIONS.get() {
            m.inc();
        }
        id
    }

    /// Sender sessions report their exit on.
    pub fn closing_sink(&self) -> mpsc::Sender<SessionClosed> {
        self.inner.closing.clone()
    }

    pub fn remove(&self, id: SessionId) -> Option<SessionEntry> {
        let (_, entry) = self.inner.sessions.remove(&id)?;
        if let Some(m) = crate::metrics::ACTIVE_SESSIONS.get() {
            m.dec();
        }
        Some(entry)
    }

    pub fn get(&self, id: SessionId) -> Option<SessionEntry> {
        self.inner.sessions.get(&id).map(|e| e.clone())
    }

    pub fn count(&self) -> usize {
        self.inner.sessions.len()
    }

    /// Number of live sessions for one user.
    pub fn sessions_for(&self, user: UserId) -> usize {
        self.inner
            .sessions
            .iter()
            .filter(|e| e.user == user)
            .count()
    }

    /// Drain the closing sink until every sender is gone.
    pub async fn run_cleanup(self, mut rx: mpsc::Receiver<SessionClosed>) {
        while let Some(closed) = rx.recv().await {
            match self.remove(closed.session) {
                Some(entry) => info!(
                    session = closed.session,
                    user = %closed.user,
                    connected_for = %(Utc::now() - entry.connected_at),
                    remaining = self.sessions_for(closed.user),
                    "session closed"
                ),
                None => debug!(session = closed.session, "closing for unknown session"),
            }
        }
    }
}
