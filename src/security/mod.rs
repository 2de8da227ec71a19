//! Credential handling: password hashing and client identity.

pub mod identity;
pub mod password;

pub use identity::{IdentityProvider, StaticTokens};
