//! Host operations gateway.
//!
//! Every host-affecting operation is an async call that completes exactly
//! once with `Ok(message)` or `Err(message)`; both messages are meant for
//! the client verbatim. Timeouts are the implementation's business.

mod directory;
mod local;

use async_trait::async_trait;
use grid_proto::{Host, Region};
use uuid::Uuid;

pub use directory::NodeDirectory;
pub use local::{LocalHostOps, NodeConsole};

/// Completion of a gateway call.
pub type OpOutcome = Result<String, String>;

#[async_trait]
pub trait HostOps: Send + Sync {
    async fn add_host(&self, address: &str) -> OpOutcome;

    async fn remove_host(&self, host: &Host) -> OpOutcome;

    async fn add_region_to_host(&self, region: &Region, host: &Host) -> OpOutcome;

    async fn remove_region_from_host(&self, region: &Region, host: &Host) -> OpOutcome;

    /// Persist a region's new coordinates.
    async fn update_region(&self, region: &Region) -> OpOutcome;

    async fn start_region(&self, region: &Region, host: &Host) -> OpOutcome;

    async fn kill_region(&self, region: &Region, host: &Host) -> OpOutcome;

    async fn open_console(
        &self,
        region: &Region,
        host: &Host,
    ) -> Result<Box<dyn Console>, String>;
}

/// An open region console. Closing is best effort.
#[async_trait]
pub trait Console: Send + Sync {
    fn region(&self) -> Uuid;

    async fn close(&self);
}
