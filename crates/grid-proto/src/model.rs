//! Entity model of the grid.
//!
//! Field names follow the JSON shape clients and nodes already speak
//! (`PascalCase`, with a few upper-case acronyms).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a user account.
pub type UserId = Uuid;
/// Identifier of a worker host.
pub type HostId = i64;
/// Identifier of an estate.
pub type EstateId = i64;
/// Identifier of a job.
pub type JobId = i64;

/// Host id meaning "not assigned to any host".
pub const UNASSIGNED_HOST: HostId = 0;

/// Users above this access level are administrators.
pub const ADMIN_ACCESS_LEVEL: i32 = 249;

/// A registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct User {
    /// Account id.
    #[serde(rename = "UserID")]
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Numeric privilege level.
    pub access_level: i32,
    /// Suspended accounts keep their data but cannot log in.
    #[serde(default)]
    pub suspended: bool,
}

impl User {
    /// Whether this user has administrative privilege.
    pub fn is_admin(&self) -> bool {
        self.access_level > ADMIN_ACCESS_LEVEL
    }
}

/// A registration awaiting approval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PendingUser {
    /// Requested name.
    pub name: String,
    /// Contact address.
    pub email: String,
    /// Free-form registration note.
    #[serde(default)]
    pub summary: String,
}

/// A user group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Group {
    /// Group id.
    #[serde(rename = "ID")]
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Founding user.
    pub founder: UserId,
    /// Member users.
    #[serde(default)]
    pub members: Vec<UserId>,
}

/// A worker machine that runs regions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Host {
    /// Host id, never [`UNASSIGNED_HOST`].
    #[serde(rename = "ID")]
    pub id: HostId,
    /// Network address the node agent connects from.
    pub address: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether a node agent is currently connected for this host.
    #[serde(default)]
    pub online: bool,
}

/// A simulated world region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Region {
    /// Region id.
    #[serde(rename = "UUID")]
    pub uuid: Uuid,
    /// Display name.
    pub name: String,
    /// Grid X coordinate.
    pub loc_x: i32,
    /// Grid Y coordinate.
    pub loc_y: i32,
    /// Owning host, or [`UNASSIGNED_HOST`].
    pub host: HostId,
    /// Estate this region belongs to.
    #[serde(rename = "EstateID", default)]
    pub estate: Option<EstateId>,
}

impl Region {
    /// Whether the region currently has a host.
    pub fn is_assigned(&self) -> bool {
        self.host != UNASSIGNED_HOST
    }
}

/// A named group of regions with an owner and managers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Estate {
    /// Estate id.
    #[serde(rename = "ID")]
    pub id: EstateId,
    /// Display name.
    pub name: String,
    /// Owning user.
    pub owner: UserId,
    /// Managers, in the order they were added.
    #[serde(default)]
    pub managers: Vec<UserId>,
    /// Member regions.
    #[serde(default)]
    pub regions: Vec<Uuid>,
}

impl Estate {
    /// Whether `user` owns or manages this estate.
    pub fn is_managed_by(&self, user: UserId) -> bool {
        self.owner == user || self.managers.contains(&user)
    }
}

/// A queued or finished background job owned by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Job {
    /// Job id.
    #[serde(rename = "ID")]
    pub id: JobId,
    /// When the job was created.
    pub timestamp: DateTime<Utc>,
    /// Job kind, e.g. `save_oar`.
    #[serde(rename = "Type")]
    pub kind: String,
    /// Owning user.
    pub user: UserId,
    /// Opaque job data.
    #[serde(default)]
    pub data: String,
}

/// One telemetry sample reported by a node.
///
/// Memory is in kB, network counters are deltas over the sampling window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostStat {
    /// Per-CPU utilisation in percent.
    #[serde(rename = "CPUPercent", default)]
    pub cpu_percent: Vec<f64>,
    /// Total memory.
    #[serde(rename = "MEMTotal", default)]
    pub mem_total: u64,
    /// Used memory.
    #[serde(rename = "MEMUsed", default)]
    pub mem_used: u64,
    /// Used memory in percent.
    #[serde(rename = "MEMPercent", default)]
    pub mem_percent: f64,
    /// Bytes sent during the window.
    #[serde(rename = "NetSent", default)]
    pub net_sent: u64,
    /// Bytes received during the window.
    #[serde(rename = "NetRecv", default)]
    pub net_recv: u64,
}

/// A host stat attributed to its host, as pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HostStatus {
    /// Reporting host.
    #[serde(rename = "ID")]
    pub id: HostId,
    /// Receive time on the server.
    pub timestamp: DateTime<Utc>,
    /// The sample.
    #[serde(flatten)]
    pub stat: HostStat,
}

/// Runtime status of a region, as pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RegionStatus {
    /// Region id.
    #[serde(rename = "UUID")]
    pub uuid: Uuid,
    /// Whether the region process is up.
    pub running: bool,
    /// Seconds since the region started.
    #[serde(default)]
    pub uptime: u64,
    /// Report time.
    pub timestamp: DateTime<Utc>,
}
