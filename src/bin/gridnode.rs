//! gridnode - worker node agent.

use gridd::config::NodeConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "gridnode.toml".to_string());

    let config = NodeConfig::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;
    info!(server = %config.node.server, "Starting gridnode");

    tokio::select! {
        _ = gridd::agent::run(config.node) => {}
        _ = tokio::signal::ctrl_c() => info!("Shutdown requested"),
    }
    Ok(())
}
