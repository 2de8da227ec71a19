//! Notification hub.
//!
//! One broadcast topic per event category. Publishing never blocks: each
//! topic is a bounded ring, and a subscriber that falls more than
//! `capacity` events behind skips the oldest ones and is told how many it
//! missed. Order within one category is preserved per subscriber.

use grid_proto::{Estate, EstateId, Host, HostId, HostStatus, Region, RegionStatus};
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

/// A state change announced to live sessions.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// A host was added or changed.
    HostUpdated(Host),
    /// A host was removed.
    HostRemoved(HostId),
    /// A host reported telemetry.
    HostStat(HostStatus),
    /// A region was added or changed.
    RegionUpdated(Region),
    /// A region was removed.
    RegionRemoved(Uuid),
    /// A region reported runtime status.
    RegionStat(RegionStatus),
    /// An estate was added or changed.
    EstateUpdated(Estate),
    /// An estate was removed.
    EstateRemoved(EstateId),
}

impl Notification {
    /// Category this notification is published on.
    pub fn category(&self) -> Category {
        match self {
            Self::HostUpdated(_) => Category::HostUpdated,
            Self::HostRemoved(_) => Category::HostRemoved,
            Self::HostStat(_) => Category::HostStat,
            Self::RegionUpdated(_) => Category::RegionUpdated,
            Self::RegionRemoved(_) => Category::RegionRemoved,
            Self::RegionStat(_) => Category::RegionStat,
            Self::EstateUpdated(_) => Category::EstateUpdated,
            Self::EstateRemoved(_) => Category::EstateRemoved,
        }
    }
}

/// Event category discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    HostUpdated,
    HostRemoved,
    HostStat,
    RegionUpdated,
    RegionRemoved,
    RegionStat,
    EstateUpdated,
    EstateRemoved,
}

impl Category {
    /// Static label for logs and metrics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HostUpdated => "host_updated",
            Self::HostRemoved => "host_removed",
            Self::HostStat => "host_stat",
            Self::RegionUpdated => "region_updated",
            Self::RegionRemoved => "region_removed",
            Self::RegionStat => "region_stat",
            Self::EstateUpdated => "estate_updated",
            Self::EstateRemoved => "estate_removed",
        }
    }

    /// Whether losing events of this category invalidates estate visibility.
    pub fn affects_visibility(self) -> bool {
        matches!(self, Self::EstateUpdated | Self::EstateRemoved)
    }
}

/// Fan-out point for state changes.
#[derive(Debug, Clone)]
pub struct NotificationHub {
    host_updated: broadcast::Sender<Host>,
    host_removed: broadcast::Sender<HostId>,
    host_stat: broadcast::Sender<HostStatus>,
    region_updated: broadcast::Sender<Region>,
    region_removed: broadcast::Sender<Uuid>,
    region_stat: broadcast::Sender<RegionStatus>,
    estate_updated: broadcast::Sender<Estate>,
    estate_removed: broadcast::Sender<EstateId>,
}

impl NotificationHub {
    /// Create a hub retaining up to `capacity` undelivered events per category.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            host_updated: broadcast::channel(capacity).0,
            host_removed: broadcast::channel(capacity).0,
            host_stat: broadcast::channel(capacity).0,
            region_updated: broadcast::channel(capacity).0,
            region_removed: broadcast::channel(capacity).0,
            region_stat: broadcast::channel(capacity).0,
            estate_updated: broadcast::channel(capacity).0,
            estate_removed: broadcast::channel(capacity).0,
        }
    }

    /// Publish to every live subscriber. Never blocks.
    pub fn publish(&self, notification: Notification) {
        // A send error only means nobody is subscribed right now.
        let delivered = match notification {
            Notification::HostUpdated(h) => self.host_updated.send(h).is_ok(),
            Notification::HostRemoved(id) => self.host_removed.send(id).is_ok(),
            Notification::HostStat(s) => self.host_stat.send(s).is_ok(),
            Notification::RegionUpdated(r) => self.region_updated.send(r).is_ok(),
            Notification::RegionRemoved(id) => self.region_removed.send(id).is_ok(),
            Notification::RegionStat(s) => self.region_stat.send(s).is_ok(),
            Notification::EstateUpdated(e) => self.estate_updated.send(e).is_ok(),
            Notification::EstateRemoved(id) => self.estate_removed.send(id).is_ok(),
        };
        if !delivered {
            tracing::trace!("notification published with no subscribers");
        }
    }

    /// Open a subscriber cursor on every category.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self) -> Subscription {
        Subscription {
            host_updated: self.host_updated.subscribe(),
            host_removed: self.host_removed.subscribe(),
            host_stat: self.host_stat.subscribe(),
            region_updated: self.region_updated.subscribe(),
            region_removed: self.region_removed.subscribe(),
            region_stat: self.region_stat.subscribe(),
            estate_updated: self.estate_updated.subscribe(),
            estate_removed: self.estate_removed.subscribe(),
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.estate_updated.receiver_count()
    }
}

/// Outcome of waiting on a [`Subscription`].
#[derive(Debug, Clone, PartialEq)]
pub enum Delivery {
    Event(Notification),
    /// The subscriber fell behind and `skipped` events of `category` were lost.
    Lagged { category: Category, skipped: u64 },
    /// The hub is gone.
    Closed,
}

/// One session's cursor over all categories.
pub struct Subscription {
    host_updated: broadcast::Receiver<Host>,
    host_removed: broadcast::Receiver<HostId>,
    host_stat: broadcast::Receiver<HostStatus>,
    region_updated: broadcast::Receiver<Region>,
    region_removed: broadcast::Receiver<Uuid>,
    region_stat: broadcast::Receiver<RegionStatus>,
    estate_updated: broadcast::Receiver<Estate>,
    estate_removed: broadcast::Receiver<EstateId>,
}

fn deliver<T>(
    res: Result<T, RecvError>,
    category: Category,
    wrap: fn(T) -> Notification,
) -> Delivery {
    match res {
        Ok(v) => Delivery::Event(wrap(v)),
        Err(RecvError::Lagged(skipped)) => Delivery::Lagged { category, skipped },
        Err(RecvError::Closed) => Delivery::Closed,
    }
}

impl Subscription {
    /// Wait for the next delivery on any category.
    ///
    /// Categories are polled in random order. Cancel safe.
    pub async fn recv(&mut self) -> Delivery {
        tokio::select! {
            r = self.host_updated.recv() => deliver(r, Category::HostUpdated, Notification::HostUpdated),
            r = self.host_removed.recv() => deliver(r, Category::HostRemoved, Notification::HostRemoved),
            r = self.host_stat.recv() => deliver(r, Category::HostStat, Notification::HostStat),
            r = self.region_updated.recv() => deliver(r, Category::RegionUpdated, Notification::RegionUpdated),
            r = self.region_removed.recv() => deliver(r, Category::RegionRemoved, Notification::RegionRemoved),
            r = self.region_stat.recv() => deliver(r, Category::RegionStat, Notification::RegionStat),
            r = self.estate_updated.recv() => deliver(r, Category::EstateUpdated, Notification::EstateUpdated),
            r = self.estate_removed.recv() => deliver(r, Category::EstateRemoved, Notification::EstateRemoved),
        }
    }
}
