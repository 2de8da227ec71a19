//! State store contract.
//!
//! Command handlers read point-in-time snapshots through [`StateStore`];
//! every getter returns a fresh copy, never a cached one.

use grid_proto::{
    Estate, EstateId, Group, Host, HostId, Job, JobId, PendingUser, Region, User, UserId,
};
use uuid::Uuid;

/// Authoritative grid state as seen by sessions.
pub trait StateStore: Send + Sync {
    fn users(&self) -> Vec<User>;
    fn pending_users(&self) -> Vec<PendingUser>;
    fn groups(&self) -> Vec<Group>;
    fn hosts(&self) -> Vec<Host>;
    fn regions(&self) -> Vec<Region>;
    fn estates(&self) -> Vec<Estate>;
    fn jobs(&self) -> Vec<Job>;

    /// Remove a job. Returns whether it existed.
    fn remove_job(&self, id: JobId) -> bool;

    /// Store an already-hashed password.
    fn set_password(&self, user: UserId, hash: String);

    /// Move a region into an estate, announcing both estates and the region.
    fn move_region_to_estate(&self, region: Uuid, estate: EstateId);

    fn user(&self, id: UserId) -> Option<User> {
        self.users().into_iter().find(|u| u.user_id == id)
    }

    fn host(&self, id: HostId) -> Option<Host> {
        self.hosts().into_iter().find(|h| h.id == id)
    }

    fn region(&self, id: Uuid) -> Option<Region> {
        self.regions().into_iter().find(|r| r.uuid == id)
    }

    fn estate(&self, id: EstateId) -> Option<Estate> {
        self.estates().into_iter().find(|e| e.id == id)
    }

    fn job(&self, id: JobId) -> Option<Job> {
        self.jobs().into_iter().find(|j| j.id == id)
    }

    fn jobs_for_user(&self, user: UserId) -> Vec<Job> {
        self.jobs().into_iter().filter(|j| j.user == user).collect()
    }
}

/// Everything needed to seed a store.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub users: Vec<User>,
    pub pending_users: Vec<PendingUser>,
    pub groups: Vec<Group>,
    pub hosts: Vec<Host>,
    pub regions: Vec<Region>,
    pub estates: Vec<Estate>,
    pub jobs: Vec<Job>,
}

/// A store mutation to replay into durable storage.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreWrite {
    UpsertHost(Host),
    DeleteHost(HostId),
    UpsertRegion(Region),
    UpsertEstate(Estate),
    DeleteJob(JobId),
    SetPassword { user: UserId, hash: String },
}
