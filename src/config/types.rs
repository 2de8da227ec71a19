//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::auth::AuthConfig;
use super::listen::{ListenConfig, NodeListenConfig};
use super::session::{HubConfig, SessionConfig};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server information.
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// Database configuration. Without it the grid starts empty and nothing persists.
    pub database: Option<DatabaseConfig>,
    /// Session queue limits.
    #[serde(default)]
    pub session: SessionConfig,
    /// Notification hub configuration.
    #[serde(default)]
    pub hub: HubConfig,
    /// Node telemetry channel configuration.
    #[serde(default)]
    pub nodes: NodeListenConfig,
    /// Client bearer tokens.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name (e.g., "grid.example.net").
    pub name: String,
    /// Prometheus metrics HTTP port (default: 9090, 0 disables).
    pub metrics_port: Option<u16>,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file, or `:memory:`.
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const MINIMAL: &str = r#"
        [server]
        name = "grid.test"

        [listen]
        websocket = "127.0.0.1:8080"
        nodes = "127.0.0.1:8081"
    "#;

    // ========================================================================
    // Loading
    // ========================================================================

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.server.name, "grid.test");
        assert!(config.server.metrics_port.is_none());
        assert!(config.database.is_none());
        assert_eq!(config.session.inbound_capacity, 32);
        assert_eq!(config.hub.capacity, 1024);
        assert!(config.auth.token.is_empty());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.listen.nodes.port(), 8081);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/gridd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn load_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[server\nname=").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn full_config_parses() {
        let toml_str = r#"
            [server]
            name = "grid.test"
            metrics_port = 0

            [listen]
            websocket = "0.0.0.0:8080"
            nodes = "0.0.0.0:8081"
            allow_origins = ["https://console.example.net"]

            [database]
            path = ":memory:"

            [session]
            inbound_capacity = 8
            outbound_capacity = 64
            max_inflight_commands = 4

            [hub]
            capacity = 16

            [nodes]
            max_line_len = 4096

            [[auth.token]]
            token = "s3cret"
            user = "0f8fad5b-d9cb-469f-a165-70867728950e"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.metrics_port, Some(0));
        assert_eq!(config.database.unwrap().path, ":memory:");
        assert_eq!(config.session.max_inflight_commands, 4);
        assert_eq!(config.hub.capacity, 16);
        assert_eq!(config.nodes.max_line_len, 4096);
        assert_eq!(config.auth.token.len(), 1);
        assert_eq!(config.listen.allow_origins.len(), 1);
    }
}
