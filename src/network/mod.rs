//! Network module.
//!
//! Contains the Gateway (WebSocket listener) and the per-client connection
//! plumbing that feeds a session.

mod connection;
mod gateway;

pub use connection::serve;
pub use gateway::{Gateway, bearer_token};
