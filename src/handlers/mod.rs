//! Client command handlers.
//!
//! Each `MessageType` maps to one handler. Handlers re-check privilege and
//! existence against a fresh store snapshot, perform their effect, and
//! return exactly one result that becomes the client's signal.

mod assign;
mod console;
mod core;
mod estates;
mod hosts;
mod jobs;
mod regions;
mod state_sync;
mod users;

#[cfg(test)]
pub(crate) mod testing;

pub use self::core::{ConsoleSlot, Context, Handler, Outbound, Registry, Route, SessionHandler};
pub use assign::reassign_region;
