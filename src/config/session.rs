//! Session and notification hub limits.

use serde::Deserialize;

/// Per-session queue limits.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Decoded client commands waiting for the session loop (default: 32).
    #[serde(default = "default_inbound_capacity")]
    pub inbound_capacity: usize,
    /// Encoded messages waiting for the socket writer (default: 256).
    #[serde(default = "default_outbound_capacity")]
    pub outbound_capacity: usize,
    /// Backend commands executing at once for one session (default: 16).
    #[serde(default = "default_max_inflight")]
    pub max_inflight_commands: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inbound_capacity: default_inbound_capacity(),
            outbound_capacity: default_outbound_capacity(),
            max_inflight_commands: default_max_inflight(),
        }
    }
}

fn default_inbound_capacity() -> usize {
    32
}

fn default_outbound_capacity() -> usize {
    256
}

fn default_max_inflight() -> usize {
    16
}

/// Notification hub configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct HubConfig {
    /// Events retained per category for slow sessions (default: 1024).
    #[serde(default = "default_hub_capacity")]
    pub capacity: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            capacity: default_hub_capacity(),
        }
    }
}

fn default_hub_capacity() -> usize {
    1024
}
