//! Handler infrastructure: context, traits and the command registry.

mod context;
mod registry;

pub use context::{ConsoleSlot, Context, Handler, Outbound, SessionHandler};
pub use registry::{Registry, Route};
