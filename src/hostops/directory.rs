//! Connected node links, keyed by host.

use std::sync::Arc;

use dashmap::DashMap;
use grid_proto::{HostId, NetworkMessage, NodeRequest};
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone, Default)]
pub struct NodeDirectory {
    links: Arc<DashMap<HostId, mpsc::Sender<NetworkMessage>>>,
}

impl NodeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the outbound queue of a freshly connected node.
    ///
    /// Replaces any previous link for the same host.
    pub fn attach(&self, host: HostId, tx: mpsc::Sender<NetworkMessage>) {
        if self.links.insert(host, tx).is_some() {
            debug!(host, "replaced stale node link");
        }
        if let Some(m) = crate::metrics::NODES_CONNECTED.get() {
            m.set(self.links.len() as i64);
        }
    }

    /// Forget a node link, unless it was already replaced by a newer one.
    pub fn detach(&self, host: HostId, tx: &mpsc::Sender<NetworkMessage>) {
        self.links
            .remove_if(&host, |_, current| current.same_channel(tx));
        if let Some(m) = crate::metrics::NODES_CONNECTED.get() {
            m.set(self.links.len() as i64);
        }
    }

    pub fn is_connected(&self, host: HostId) -> bool {
        self.links.contains_key(&host)
    }

    /// Queue a request for a node.
    pub async fn send(&self, host: HostId, request: NodeRequest) -> Result<(), String> {
        let tx = self
            .links
            .get(&host)
            .map(|l| l.clone())
            .ok_or_else(|| "Host is not connected".to_string())?;
        tx.send(request.into())
            .await
            .map_err(|_| "Host is not connected".to_string())
    }
}
