//! The Grid: shared services every session and listener works against.

use std::sync::Arc;

use super::hub::NotificationHub;
use super::sessions::SessionRegistry;
use super::store::StateStore;
use crate::config::SessionConfig;
use crate::handlers::Registry;
use crate::hostops::HostOps;

/// Explicitly constructed bundle of shared services.
pub struct Grid {
    /// Authoritative entity state.
    pub store: Arc<dyn StateStore>,
    /// Change fan-out.
    pub hub: NotificationHub,
    /// Host-affecting operations.
    pub hosts: Arc<dyn HostOps>,
    /// Live sessions.
    pub sessions: SessionRegistry,
    /// Command handlers.
    pub registry: Registry,
    /// Per-session limits.
    pub limits: SessionConfig,
}

impl Grid {
    pub fn new(
        store: Arc<dyn StateStore>,
        hub: NotificationHub,
        hosts: Arc<dyn HostOps>,
        sessions: SessionRegistry,
        limits: SessionConfig,
    ) -> Self {
        Self {
            store,
            hub,
            hosts,
            sessions,
            registry: Registry::new(),
            limits,
        }
    }
}
