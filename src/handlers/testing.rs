//! Fixtures shared by handler and session unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use grid_proto::{ClientRequest, Estate, Host, Job, Region, ServerMessage, User, UserId};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ConsoleSlot, Context, Outbound};
use crate::config::SessionConfig;
use crate::hostops::{Console, HostOps, OpOutcome};
use crate::state::{Grid, MemoryStore, NotificationHub, SessionRegistry, Snapshot, StateStore};

pub const ADMIN: Uuid = Uuid::from_u128(0xa0);
pub const OWNER: Uuid = Uuid::from_u128(0xa1);
pub const OUTSIDER: Uuid = Uuid::from_u128(0xa2);
pub const MANAGER: Uuid = Uuid::from_u128(0xa3);

pub const R1: Uuid = Uuid::from_u128(0x1);
pub const R2: Uuid = Uuid::from_u128(0x2);
pub const R3: Uuid = Uuid::from_u128(0x3);

pub fn user(id: UserId, name: &str, access_level: i32) -> User {
    User {
        user_id: id,
        name: name.into(),
        email: format!("{name}@grid.test"),
        access_level,
        suspended: false,
    }
}

pub fn host(id: i64) -> Host {
    Host {
        id,
        address: format!("10.0.0.{id}"),
        name: format!("host{id}"),
        online: false,
    }
}

pub fn region(uuid: Uuid, host: i64, estate: Option<i64>) -> Region {
    Region {
        uuid,
        name: format!("region-{}", uuid.as_u128()),
        loc_x: 1000,
        loc_y: 1000,
        host,
        estate,
    }
}

pub fn estate(id: i64, owner: UserId, managers: Vec<UserId>, regions: Vec<Uuid>) -> Estate {
    Estate {
        id,
        name: format!("estate{id}"),
        owner,
        managers,
        regions,
    }
}

pub fn job(id: i64, user: UserId) -> Job {
    Job {
        id,
        timestamp: Utc::now(),
        kind: "load_oar".into(),
        user,
        data: String::new(),
    }
}

/// Estate 1 (OWNER, managed by MANAGER) holds R1 on host 3.
/// Estate 2 (ADMIN) holds R2, unassigned, and R3 on host 7.
pub fn grid_snapshot() -> Snapshot {
    Snapshot {
        users: vec![
            user(ADMIN, "admin", 250),
            user(OWNER, "owner", 10),
            user(OUTSIDER, "outsider", 10),
            user(MANAGER, "manager", 10),
        ],
        hosts: vec![host(3), host(7)],
        regions: vec![region(R1, 3, Some(1)), region(R2, 0, Some(2)), region(R3, 7, Some(2))],
        estates: vec![
            estate(1, OWNER, vec![MANAGER], vec![R1]),
            estate(2, ADMIN, vec![], vec![R2, R3]),
        ],
        jobs: vec![job(1, OWNER), job(2, OUTSIDER)],
        ..Snapshot::default()
    }
}

/// Host gateway that records calls and answers from a script.
#[derive(Default)]
pub struct ScriptedHostOps {
    calls: Mutex<Vec<String>>,
    outcomes: Mutex<HashMap<&'static str, OpOutcome>>,
    stalled: Mutex<HashSet<&'static str>>,
}

impl ScriptedHostOps {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the outcome of one operation; unscripted operations succeed.
    pub fn answer(&self, op: &'static str, outcome: OpOutcome) {
        self.outcomes.lock().insert(op, outcome);
    }

    /// Make `op` record its call and then never return.
    pub fn stall(&self, op: &'static str) {
        self.stalled.lock().insert(op);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    async fn run(&self, op: &'static str, detail: String) -> OpOutcome {
        let outcome = self.call(op, detail);
        let stalled = self.stalled.lock().contains(op);
        if stalled {
            std::future::pending::<()>().await;
        }
        outcome
    }

    fn call(&self, op: &'static str, detail: String) -> OpOutcome {
        self.calls.lock().push(format!("{op} {detail}").trim_end().to_string());
        self.outcomes
            .lock()
            .get(op)
            .cloned()
            .unwrap_or_else(|| Ok(format!("{op} ok")))
    }
}

#[async_trait]
impl HostOps for ScriptedHostOps {
    async fn add_host(&self, address: &str) -> OpOutcome {
        self.run("add_host", address.to_string()).await
    }

    async fn remove_host(&self, host: &Host) -> OpOutcome {
        self.run("remove_host", host.id.to_string()).await
    }

    async fn add_region_to_host(&self, region: &Region, host: &Host) -> OpOutcome {
        self.run("add_region_to_host", format!("{} {}", region.uuid.as_u128(), host.id)).await
    }

    async fn remove_region_from_host(&self, region: &Region, host: &Host) -> OpOutcome {
        self.run(
            "remove_region_from_host",
            format!("{} {}", region.uuid.as_u128(), host.id),
        )
        .await
    }

    async fn update_region(&self, region: &Region) -> OpOutcome {
        self.run(
            "update_region",
            format!("{} {} {}", region.uuid.as_u128(), region.loc_x, region.loc_y),
        )
        .await
    }

    async fn start_region(&self, region: &Region, host: &Host) -> OpOutcome {
        self.run("start_region", format!("{} {}", region.uuid.as_u128(), host.id)).await
    }

    async fn kill_region(&self, region: &Region, host: &Host) -> OpOutcome {
        self.run("kill_region", format!("{} {}", region.uuid.as_u128(), host.id)).await
    }

    async fn open_console(&self, region: &Region, host: &Host) -> Result<Box<dyn Console>, String> {
        self.call("open_console", format!("{} {}", region.uuid.as_u128(), host.id))?;
        Ok(Box::new(TestConsole {
            region: region.uuid,
            closed: Arc::default(),
        }))
    }
}

/// Console that remembers whether it was closed.
pub struct TestConsole {
    pub region: Uuid,
    pub closed: Arc<Mutex<bool>>,
}

#[async_trait]
impl Console for TestConsole {
    fn region(&self) -> Uuid {
        self.region
    }

    async fn close(&self) {
        *self.closed.lock() = true;
    }
}

pub struct Harness {
    pub grid: Arc<Grid>,
    pub store: Arc<MemoryStore>,
    pub ops: Arc<ScriptedHostOps>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_snapshot(grid_snapshot())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        let hub = NotificationHub::new(64);
        let store = Arc::new(MemoryStore::from_snapshot(snapshot, hub.clone()));
        let ops = ScriptedHostOps::new();
        let (sessions, _closing) = SessionRegistry::new();
        let grid = Arc::new(Grid::new(
            store.clone(),
            hub,
            ops.clone(),
            sessions,
            SessionConfig::default(),
        ));
        Self { grid, store, ops }
    }

    /// A context for `user` plus the receiving end of its outbound queue.
    pub fn context(&self, user: UserId) -> (Context, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(256);
        let is_admin = self.store.users().iter().any(|u| u.user_id == user && u.is_admin());
        let ctx = Context {
            session: 1,
            user,
            is_admin,
            grid: self.grid.clone(),
            sender: Outbound::new(tx),
            console: ConsoleSlot::default(),
        };
        (ctx, rx)
    }
}

pub fn request(message_type: &str, body: serde_json::Value) -> ClientRequest {
    ClientRequest {
        message_id: 42,
        message_type: message_type.into(),
        message: body,
    }
}

/// Drain everything queued so far.
pub fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
    let mut out = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        out.push(msg);
    }
    out
}
