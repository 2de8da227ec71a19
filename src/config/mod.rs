//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, DatabaseConfig)
//! - [`listen`]: Network listener configuration (ListenConfig)
//! - [`session`]: Per-session queue limits and hub capacity (SessionConfig, HubConfig)
//! - [`auth`]: Static bearer tokens and seeded accounts (AuthConfig, TokenBlock, UserBlock)
//! - [`node`]: Node agent configuration (NodeConfig)

mod auth;
mod listen;
mod node;
mod session;
mod types;

pub use auth::{AuthConfig, TokenBlock, UserBlock};
pub use listen::{ListenConfig, NodeListenConfig};
pub use node::{NodeAgentConfig, NodeConfig};
pub use session::{HubConfig, SessionConfig};
pub use types::{Config, ConfigError, DatabaseConfig, ServerConfig};
