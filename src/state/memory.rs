//! In-memory state store.
//!
//! Concurrent maps for every entity. Each mutation announces itself on the
//! [`NotificationHub`] and, when persistence is attached, is queued for the
//! database writer.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use grid_proto::{
    Estate, EstateId, Group, Host, HostId, HostStat, HostStatus, Job, JobId, PendingUser, Region,
    UNASSIGNED_HOST, User, UserId,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::hub::{Notification, NotificationHub};
use super::store::{Snapshot, StateStore, StoreWrite};

/// Why a guarded host or region change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refused {
    NoHost,
    NoRegion,
    /// The region is on another host than expected.
    RegionMoved(HostId),
    /// The host still has regions placed on it.
    HostBusy,
}

pub struct MemoryStore {
    users: DashMap<UserId, User>,
    pending_users: DashMap<String, PendingUser>,
    groups: DashMap<Uuid, Group>,
    hosts: DashMap<HostId, Host>,
    regions: DashMap<Uuid, Region>,
    estates: DashMap<EstateId, Estate>,
    jobs: DashMap<JobId, Job>,
    passwords: DashMap<UserId, String>,
    next_host_id: AtomicI64,
    hub: NotificationHub,
    writes: Option<mpsc::UnboundedSender<StoreWrite>>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new(hub: NotificationHub) -> Self {
        Self::from_snapshot(Snapshot::default(), hub)
    }

    /// Store seeded from a snapshot. Seeding publishes nothing.
    pub fn from_snapshot(snapshot: Snapshot, hub: NotificationHub) -> Self {
        let max_host = snapshot.hosts.iter().map(|h| h.id).max().unwrap_or(0);
        Self {
            users: snapshot.users.into_iter().map(|u| (u.user_id, u)).collect(),
            pending_users: snapshot
                .pending_users
                .into_iter()
                .map(|p| (p.email.clone(), p))
                .collect(),
            groups: snapshot.groups.into_iter().map(|g| (g.id, g)).collect(),
            hosts: snapshot.hosts.into_iter().map(|h| (h.id, h)).collect(),
            regions: snapshot.regions.into_iter().map(|r| (r.uuid, r)).collect(),
            estates: snapshot.estates.into_iter().map(|e| (e.id, e)).collect(),
            jobs: snapshot.jobs.into_iter().map(|j| (j.id, j)).collect(),
            passwords: DashMap::new(),
            next_host_id: AtomicI64::new(max_host + 1),
            hub,
            writes: None,
        }
    }

    /// Queue every mutation for durable storage.
    pub fn with_persistence(mut self, writes: mpsc::UnboundedSender<StoreWrite>) -> Self {
        self.writes = Some(writes);
        self
    }

    pub fn hub(&self) -> &NotificationHub {
        &self.hub
    }

    fn persist(&self, write: StoreWrite) {
        if let Some(tx) = &self.writes
            && tx.send(write).is_err()
        {
            warn!("database writer is gone, change kept in memory only");
        }
    }

    // ========================================================================
    // Hosts
    // ========================================================================

    /// Find the host registered for a node address.
    pub fn host_by_address(&self, address: &str) -> Option<Host> {
        self.hosts
            .iter()
            .find(|h| h.address == address)
            .map(|h| h.clone())
    }

    /// Register a new host and return it.
    pub fn add_host(&self, address: &str) -> Host {
        let host = Host {
            id: self.next_host_id.fetch_add(1, Ordering::SeqCst),
            address: address.to_string(),
            name: address.to_string(),
            online: false,
        };
        self.hosts.insert(host.id, host.clone());
        debug!(host = host.id, %address, "host added");
        self.persist(StoreWrite::UpsertHost(host.clone()));
        self.hub.publish(Notification::HostUpdated(host.clone()));
        host
    }

    /// Remove a host with no regions placed on it.
    ///
    /// The emptiness check runs under the host's lock, so an attach racing
    /// the removal either lands first and blocks it or finds no host.
    pub fn remove_idle_host(&self, id: HostId) -> Result<Host, Refused> {
        let removed = self
            .hosts
            .remove_if(&id, |_, _| !self.regions.iter().any(|r| r.host == id));
        match removed {
            Some((_, host)) => {
                self.persist(StoreWrite::DeleteHost(id));
                self.hub.publish(Notification::HostRemoved(id));
                Ok(host)
            }
            None if self.hosts.contains_key(&id) => Err(Refused::HostBusy),
            None => Err(Refused::NoHost),
        }
    }

    /// Flip a host's online flag, announcing the change.
    pub fn set_host_online(&self, id: HostId, online: bool) {
        let updated = match self.hosts.get_mut(&id) {
            Some(mut host) if host.online != online => {
                host.online = online;
                host.clone()
            }
            _ => return,
        };
        self.hub.publish(Notification::HostUpdated(updated));
    }

    /// Announce a telemetry sample from a host.
    pub fn record_host_stat(&self, id: HostId, stat: HostStat) {
        self.hub.publish(Notification::HostStat(HostStatus {
            id,
            timestamp: Utc::now(),
            stat,
        }));
    }

    // ========================================================================
    // Regions
    // ========================================================================

    /// Move a region from host `from` to host `to` in one step.
    ///
    /// A real destination host is held while the region is rewritten.
    pub fn place_region(&self, id: Uuid, from: HostId, to: HostId) -> Result<Region, Refused> {
        // Lock order is hosts then regions, as in `remove_idle_host`.
        let target = match to {
            UNASSIGNED_HOST => None,
            to => Some(self.hosts.get(&to).ok_or(Refused::NoHost)?),
        };
        let updated = {
            let mut region = self.regions.get_mut(&id).ok_or(Refused::NoRegion)?;
            if region.host != from {
                return Err(Refused::RegionMoved(region.host));
            }
            region.host = to;
            region.clone()
        };
        drop(target);
        self.region_changed(updated.clone());
        Ok(updated)
    }

    /// Set a region's coordinates. Returns the updated region.
    pub fn relocate_region(&self, id: Uuid, x: i32, y: i32) -> Option<Region> {
        let updated = {
            let mut region = self.regions.get_mut(&id)?;
            region.loc_x = x;
            region.loc_y = y;
            region.clone()
        };
        self.region_changed(updated.clone());
        Some(updated)
    }

    fn region_changed(&self, region: Region) {
        self.persist(StoreWrite::UpsertRegion(region.clone()));
        self.hub.publish(Notification::RegionUpdated(region));
    }

    fn estate_changed(&self, estate: Estate) {
        self.persist(StoreWrite::UpsertEstate(estate.clone()));
        self.hub.publish(Notification::EstateUpdated(estate));
    }
}

fn sorted<K, T, O>(map: &DashMap<K, T>, key: impl Fn(&T) -> O) -> Vec<T>
where
    K: Eq + std::hash::Hash,
    T: Clone,
    O: Ord,
{
    let mut items: Vec<T> = map.iter().map(|e| e.value().clone()).collect();
    items.sort_by_key(|item| key(item));
    items
}

impl StateStore for MemoryStore {
    fn users(&self) -> Vec<User> {
        sorted(&self.users, |u| u.name.clone())
    }

    fn pending_users(&self) -> Vec<PendingUser> {
        sorted(&self.pending_users, |p| p.email.clone())
    }

    fn groups(&self) -> Vec<Group> {
        sorted(&self.groups, |g| g.name.clone())
    }

    fn hosts(&self) -> Vec<Host> {
        sorted(&self.hosts, |h| h.id)
    }

    fn regions(&self) -> Vec<Region> {
        sorted(&self.regions, |r| r.name.clone())
    }

    fn estates(&self) -> Vec<Estate> {
        sorted(&self.estates, |e| e.id)
    }

    fn jobs(&self) -> Vec<Job> {
        sorted(&self.jobs, |j| j.id)
    }

    fn remove_job(&self, id: JobId) -> bool {
        if self.jobs.remove(&id).is_none() {
            return false;
        }
        self.persist(StoreWrite::DeleteJob(id));
        true
    }

    fn set_password(&self, user: UserId, hash: String) {
        self.passwords.insert(user, hash.clone());
        self.persist(StoreWrite::SetPassword { user, hash });
    }

    fn move_region_to_estate(&self, region: Uuid, estate: EstateId) {
        if !self.estates.contains_key(&estate) {
            warn!(%region, estate, "move to unknown estate dropped");
            return;
        }
        let previous = {
            let Some(mut r) = self.regions.get_mut(&region) else {
                warn!(%region, estate, "move of unknown region dropped");
                return;
            };
            if r.estate == Some(estate) {
                return;
            }
            r.estate.replace(estate)
        };

        if let Some(old_id) = previous {
            let old = self.estates.get_mut(&old_id).map(|mut old| {
                old.regions.retain(|r| *r != region);
                old.clone()
            });
            if let Some(old) = old {
                self.estate_changed(old);
            }
        }

        let new = self.estates.get_mut(&estate).map(|mut new| {
            if !new.regions.contains(&region) {
                new.regions.push(region);
            }
            new.clone()
        });
        if let Some(new) = new {
            self.estate_changed(new);
        }

        if let Some(r) = self.regions.get(&region).map(|r| r.clone()) {
            self.region_changed(r);
        }
    }

    fn user(&self, id: UserId) -> Option<User> {
        self.users.get(&id).map(|u| u.clone())
    }

    fn host(&self, id: HostId) -> Option<Host> {
        self.hosts.get(&id).map(|h| h.clone())
    }

    fn region(&self, id: Uuid) -> Option<Region> {
        self.regions.get(&id).map(|r| r.clone())
    }

    fn estate(&self, id: EstateId) -> Option<Estate> {
        self.estates.get(&id).map(|e| e.clone())
    }

    fn job(&self, id: JobId) -> Option<Job> {
        self.jobs.get(&id).map(|j| j.clone())
    }
}

#[cfg(test)]
impl MemoryStore {
    pub(crate) fn password_hash(&self, user: UserId) -> Option<String> {
        self.passwords.get(&user).map(|h| h.clone())
    }
}
