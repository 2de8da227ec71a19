//! Node agent configuration.

use serde::Deserialize;
use std::path::Path;

use super::types::ConfigError;

/// Top-level node agent configuration file.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    /// Agent settings.
    pub node: NodeAgentConfig,
}

/// `[node]` table.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeAgentConfig {
    /// Control-plane node address (e.g., "grid.example.net:8081").
    pub server: String,
    /// Seconds to wait before reconnecting (default: 10).
    #[serde(default = "default_retry_secs")]
    pub retry_secs: u64,
}

fn default_retry_secs() -> u64 {
    10
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}
