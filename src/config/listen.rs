//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address for client WebSocket connections (e.g., "0.0.0.0:8080").
    pub websocket: SocketAddr,
    /// Address for node telemetry connections (e.g., "0.0.0.0:8081").
    pub nodes: SocketAddr,
    /// Allowed origins for CORS (e.g., `["https://example.com"]`).
    /// Empty list allows all origins.
    #[serde(default)]
    pub allow_origins: Vec<String>,
}

/// Node telemetry channel limits.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeListenConfig {
    /// Longest accepted frame in bytes.
    #[serde(default = "default_max_line_len")]
    pub max_line_len: usize,
}

impl Default for NodeListenConfig {
    fn default() -> Self {
        Self {
            max_line_len: default_max_line_len(),
        }
    }
}

fn default_max_line_len() -> usize {
    grid_proto::line::DEFAULT_MAX_LINE_LEN
}
