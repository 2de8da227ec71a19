//! State management module.
//!
//! Contains the Grid (shared server state) and its parts: the state store,
//! the notification hub and the live session registry.

mod grid;
pub mod hub;
mod memory;
pub mod sessions;
mod store;

pub use grid::Grid;
pub use hub::{Category, Delivery, Notification, NotificationHub, Subscription};
pub use memory::{MemoryStore, Refused};
pub use sessions::{SessionClosed, SessionId, SessionRegistry};
pub use store::{Snapshot, StateStore, StoreWrite};
