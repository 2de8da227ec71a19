//! Host operations applied directly to the in-memory store.
//!
//! Placement changes are checked and applied under the store's entry locks,
//! so a command that validated against an older snapshot still cannot
//! double-assign a region or strand one on a removed host.

use std::sync::Arc;

use async_trait::async_trait;
use grid_proto::{Host, NodeRequest, Region, UNASSIGNED_HOST};
use tracing::{debug, info};
use uuid::Uuid;

use super::{Console, HostOps, NodeDirectory, OpOutcome};
use crate::state::{MemoryStore, Refused, StateStore};

pub struct LocalHostOps {
    store: Arc<MemoryStore>,
    nodes: NodeDirectory,
}

impl LocalHostOps {
    pub fn new(store: Arc<MemoryStore>, nodes: NodeDirectory) -> Self {
        Self { store, nodes }
    }

    /// Relay a region request to the node running `host`.
    async fn relay(&self, region: &Region, host: &Host, request: NodeRequest) -> OpOutcome {
        let current = self
            .store
            .region(region.uuid)
            .ok_or_else(|| "Region does not exist".to_string())?;
        if current.host != host.id {
            return Err("Region is not on that host".to_string());
        }
        self.nodes.send(host.id, request).await?;
        debug!(host = host.id, region = %region.uuid, verb = request.verb(), "request relayed");
        Ok(format!("{} requested", request.verb()))
    }
}

#[async_trait]
impl HostOps for LocalHostOps {
    async fn add_host(&self, address: &str) -> OpOutcome {
        let address = address.trim();
        if address.is_empty() {
            return Err("Invalid address".to_string());
        }
        if self.store.host_by_address(address).is_some() {
            return Err("Host already exists".to_string());
        }
        let host = self.store.add_host(address);
        info!(host = host.id, %address, "host registered");
        Ok("Host added".to_string())
    }

    async fn remove_host(&self, host: &Host) -> OpOutcome {
        match self.store.remove_idle_host(host.id) {
            Ok(_) => {
                info!(host = host.id, "host removed");
                Ok("Host removed".to_string())
            }
            Err(Refused::HostBusy) => Err("Host has regions assigned".to_string()),
            Err(_) => Err("Host does not exist".to_string()),
        }
    }

    async fn add_region_to_host(&self, region: &Region, host: &Host) -> OpOutcome {
        match self.store.place_region(region.uuid, UNASSIGNED_HOST, host.id) {
            Ok(_) => {
                info!(host = host.id, region = %region.uuid, "region assigned");
                Ok("Region assigned to host".to_string())
            }
            Err(Refused::RegionMoved(current)) if current == host.id => {
                Ok("Region assigned to host".to_string())
            }
            Err(Refused::RegionMoved(_)) => Err("Region is already assigned to a host".to_string()),
            Err(Refused::NoHost | Refused::HostBusy) => Err("Host does not exist".to_string()),
            Err(Refused::NoRegion) => Err("Region does not exist".to_string()),
        }
    }

    async fn remove_region_from_host(&self, region: &Region, host: &Host) -> OpOutcome {
        let current = self
            .store
            .region(region.uuid)
            .ok_or_else(|| "Region does not exist".to_string())?;
        if current.host != host.id {
            return Err("Region is not on that host".to_string());
        }
        if self.nodes.is_connected(host.id) {
            self.nodes
                .send(host.id, NodeRequest::RemoveRegion(region.uuid))
                .await?;
        }
        self.store
            .place_region(region.uuid, host.id, UNASSIGNED_HOST)
            .map_err(|e| match e {
                Refused::RegionMoved(_) => "Region is not on that host".to_string(),
                _ => "Region does not exist".to_string(),
            })?;
        info!(host = host.id, region = %region.uuid, "region released");
        Ok("Region removed from host".to_string())
    }

    async fn update_region(&self, region: &Region) -> OpOutcome {
        self.store
            .relocate_region(region.uuid, region.loc_x, region.loc_y)
            .map(|_| "Region updated".to_string())
            .ok_or_else(|| "Region does not exist".to_string())
    }

    async fn start_region(&self, region: &Region, host: &Host) -> OpOutcome {
        self.relay(region, host, NodeRequest::StartRegion(region.uuid))
            .await
    }

    async fn kill_region(&self, region: &Region, host: &Host) -> OpOutcome {
        self.relay(region, host, NodeRequest::KillRegion(region.uuid))
            .await
    }

    async fn open_console(
        &self,
        region: &Region,
        host: &Host,
    ) -> Result<Box<dyn Console>, String> {
        self.relay(region, host, NodeRequest::OpenConsole(region.uuid))
            .await?;
        Ok(Box::new(NodeConsole {
            region: region.uuid,
            host: host.id,
            nodes: self.nodes.clone(),
        }))
    }
}

/// Console attached through a node link.
pub struct NodeConsole {
    region: Uuid,
    host: i64,
    nodes: NodeDirectory,
}

#[async_trait]
impl Console for NodeConsole {
    fn region(&self) -> Uuid {
        self.region
    }

    async fn close(&self) {
        if let Err(e) = self
            .nodes
            .send(self.host, NodeRequest::CloseConsole(self.region))
            .await
        {
            debug!(
                host = self.host,
                region = %self.region,
                error = %e,
                "console close not delivered"
            );
        }
    }
}
