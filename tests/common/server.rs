//! Test server management.
//!
//! Runs a gridd instance inside the test process on ephemeral ports. Every
//! seeded user can log in with a token equal to their name.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use gridd::config::{SessionConfig, TokenBlock};
use gridd::hostops::{Console, HostOps, LocalHostOps, NodeDirectory, OpOutcome};
use gridd::network::Gateway;
use gridd::nodes::NodeListener;
use gridd::security::StaticTokens;
use gridd::state::{Grid, MemoryStore, NotificationHub, SessionRegistry, Snapshot};
use grid_proto::{Host, Region};
use parking_lot::Mutex;
use tokio::sync::broadcast;

/// A running test server.
pub struct TestServer {
    ws_addr: SocketAddr,
    node_addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub hosts: Arc<RecordingHostOps>,
    shutdown: broadcast::Sender<()>,
}

impl TestServer {
    /// Start a server seeded with `snapshot`.
    pub async fn spawn(snapshot: Snapshot) -> anyhow::Result<Self> {
        let tokens = snapshot
            .users
            .iter()
            .map(|u| TokenBlock {
                token: u.name.clone(),
                user: u.user_id,
            })
            .collect();

        let hub = NotificationHub::new(256);
        let store = Arc::new(MemoryStore::from_snapshot(snapshot, hub.clone()));
        let nodes = NodeDirectory::new();
        let hosts = Arc::new(RecordingHostOps::new(LocalHostOps::new(
            Arc::clone(&store),
            nodes.clone(),
        )));
        let (sessions, closing) = SessionRegistry::new();
        tokio::spawn(sessions.clone().run_cleanup(closing));
        let grid = Arc::new(Grid::new(
            store.clone(),
            hub,
            hosts.clone(),
            sessions,
            SessionConfig::default(),
        ));

        let (shutdown, _) = broadcast::channel(1);
        let gateway = Gateway::bind(
            "127.0.0.1:0".parse()?,
            Vec::new(),
            grid,
            Arc::new(StaticTokens::new(tokens)),
            shutdown.clone(),
        )
        .await?;
        let ws_addr = gateway.local_addr()?;
        tokio::spawn(gateway.run());

        let listener = NodeListener::bind(
            "127.0.0.1:0".parse()?,
            Arc::clone(&store),
            nodes,
            4096,
            shutdown.clone(),
        )
        .await?;
        let node_addr = listener.local_addr()?;
        tokio::spawn(listener.run());

        Ok(Self {
            ws_addr,
            node_addr,
            store,
            hosts,
            shutdown,
        })
    }

    /// Connect a client logging in as `name`.
    pub async fn connect(&self, name: &str) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::connect(self.ws_addr, name).await
    }

    #[allow(dead_code)]
    pub fn ws_addr(&self) -> SocketAddr {
        self.ws_addr
    }

    #[allow(dead_code)]
    pub fn node_addr(&self) -> SocketAddr {
        self.node_addr
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
    }
}

/// Host operations that record every call and can fail region detach.
pub struct RecordingHostOps {
    inner: LocalHostOps,
    calls: Mutex<Vec<String>>,
    detach_failure: Mutex<Option<String>>,
}

impl RecordingHostOps {
    fn new(inner: LocalHostOps) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            detach_failure: Mutex::new(None),
        }
    }

    /// Make every region detach fail with `message`.
    #[allow(dead_code)]
    pub fn fail_detach(&self, message: &str) {
        *self.detach_failure.lock() = Some(message.to_string());
    }

    #[allow(dead_code)]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

#[async_trait]
impl HostOps for RecordingHostOps {
    async fn add_host(&self, address: &str) -> OpOutcome {
        self.record(format!("add_host {address}"));
        self.inner.add_host(address).await
    }

    async fn remove_host(&self, host: &Host) -> OpOutcome {
        self.record(format!("remove_host {}", host.id));
        self.inner.remove_host(host).await
    }

    async fn add_region_to_host(&self, region: &Region, host: &Host) -> OpOutcome {
        self.record(format!("add_region_to_host {} {}", region.uuid, host.id));
        self.inner.add_region_to_host(region, host).await
    }

    async fn remove_region_from_host(&self, region: &Region, host: &Host) -> OpOutcome {
        self.record(format!("remove_region_from_host {} {}", region.uuid, host.id));
        let failure = self.detach_failure.lock().clone();
        match failure {
            Some(message) => Err(message),
            None => self.inner.remove_region_from_host(region, host).await,
        }
    }

    async fn update_region(&self, region: &Region) -> OpOutcome {
        self.record(format!("update_region {}", region.uuid));
        self.inner.update_region(region).await
    }

    async fn start_region(&self, region: &Region, host: &Host) -> OpOutcome {
        self.record(format!("start_region {} {}", region.uuid, host.id));
        self.inner.start_region(region, host).await
    }

    async fn kill_region(&self, region: &Region, host: &Host) -> OpOutcome {
        self.record(format!("kill_region {} {}", region.uuid, host.id));
        self.inner.kill_region(region, host).await
    }

    async fn open_console(
        &self,
        region: &Region,
        host: &Host,
    ) -> Result<Box<dyn Console>, String> {
        self.record(format!("open_console {} {}", region.uuid, host.id));
        self.inner.open_console(region, host).await
    }
}

/// A small grid: estate 1 (owned by `u1`) holds R1 on host 3, estate 2
/// (owned by `root`) holds R2 unassigned. `u2` manages nothing.
pub mod fixtures {
    use chrono::Utc;
    use gridd::state::Snapshot;
    use grid_proto::{Estate, Host, Job, Region, User};
    use uuid::Uuid;

    pub const ROOT: Uuid = Uuid::from_u128(0x100);
    pub const U1: Uuid = Uuid::from_u128(0x101);
    pub const U2: Uuid = Uuid::from_u128(0x102);
    pub const R1: Uuid = Uuid::from_u128(0x201);
    pub const R2: Uuid = Uuid::from_u128(0x202);

    fn user(id: Uuid, name: &str, access_level: i32) -> User {
        User {
            user_id: id,
            name: name.to_string(),
            email: format!("{name}@grid.test"),
            access_level,
            suspended: false,
        }
    }

    fn host(id: i64) -> Host {
        Host {
            id,
            // Nodes in these tests connect from loopback; only host 3 may.
            address: if id == 3 {
                "127.0.0.1".to_string()
            } else {
                format!("10.0.0.{id}")
            },
            name: format!("sim{id}"),
            online: false,
        }
    }

    fn region(uuid: Uuid, name: &str, host: i64, estate: i64) -> Region {
        Region {
            uuid,
            name: name.to_string(),
            loc_x: 1000,
            loc_y: 1000,
            host,
            estate: Some(estate),
        }
    }

    fn job(id: i64, user: Uuid) -> Job {
        Job {
            id,
            timestamp: Utc::now(),
            kind: "save_oar".to_string(),
            user,
            data: String::new(),
        }
    }

    pub fn grid() -> Snapshot {
        Snapshot {
            users: vec![
                user(ROOT, "root", 250),
                user(U1, "u1", 0),
                user(U2, "u2", 0),
            ],
            hosts: vec![host(3), host(7)],
            regions: vec![region(R1, "r1", 3, 1), region(R2, "r2", 0, 2)],
            estates: vec![
                Estate {
                    id: 1,
                    name: "E1".to_string(),
                    owner: U1,
                    managers: Vec::new(),
                    regions: vec![R1],
                },
                Estate {
                    id: 2,
                    name: "E2".to_string(),
                    owner: ROOT,
                    managers: Vec::new(),
                    regions: vec![R2],
                },
            ],
            jobs: vec![job(1, U1), job(2, U2)],
            ..Snapshot::default()
        }
    }
}
