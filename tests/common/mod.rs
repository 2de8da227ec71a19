//! Integration test common infrastructure.
//!
//! Provides an in-process grid server, a WebSocket test client and a fake
//! node agent.

pub mod client;
pub mod node;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use node::TestNode;
#[allow(unused_imports)]
pub use server::{fixtures, TestServer};
