//! Telemetry utilities for command timing and span construction.

use std::time::Instant;

/// Guard for timing command execution and recording metrics.
///
/// Records command latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Standardized span constructors.
pub mod spans {
    use std::net::SocketAddr;

    use grid_proto::{HostId, UserId};
    use tracing::{Span, info_span};

    use crate::state::SessionId;

    /// Span for a client session.
    pub fn session(id: SessionId, user: UserId) -> Span {
        info_span!("session", session = id, user = %user)
    }

    /// Span for a node telemetry connection.
    pub fn node(host: HostId, peer: SocketAddr) -> Span {
        info_span!("node", host, peer = %peer)
    }

    /// Span for one command execution.
    pub fn command(name: &str, session: SessionId, message_id: i64) -> Span {
        info_span!("command", command = %name, session, message_id)
    }
}
