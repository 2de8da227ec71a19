//! gridd - grid control plane server.

use std::sync::Arc;

use gridd::config::Config;
use gridd::db::{self, Database};
use gridd::hostops::{LocalHostOps, NodeDirectory};
use gridd::network::Gateway;
use gridd::nodes::NodeListener;
use gridd::security::StaticTokens;
use gridd::state::{Grid, MemoryStore, NotificationHub, SessionRegistry, Snapshot};
use gridd::{http, metrics};
use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
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
        .unwrap_or_else(|| "gridd.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    info!(server = %config.server.name, "Starting gridd");

    // metrics_port = 0 disables the HTTP endpoint.
    match config.server.metrics_port {
        Some(0) | None => info!("Metrics disabled"),
        Some(port) => {
            metrics::init();
            tokio::spawn(async move {
                http::run_http_server(port).await;
            });
            info!(port, "Prometheus HTTP server started");
        }
    }

    let seeded: Vec<_> = config.auth.user.iter().map(|u| u.to_user()).collect();

    // Without a database the grid starts from the seeded accounts only and
    // forgets everything on exit.
    let (snapshot, writes) = match &config.database {
        Some(database) => {
            let db = Database::new(&database.path).await?;
            for user in &seeded {
                if db.grid().ensure_user(user).await? {
                    info!(user = %user.user_id, name = %user.name, "Seeded account");
                }
            }
            let snapshot = db.grid().load_snapshot().await?;
            let (tx, rx) = mpsc::unbounded_channel();
            tokio::spawn(db::writer::run(db, rx));
            (snapshot, Some(tx))
        }
        None => {
            warn!("No [database] configured, state is kept in memory only");
            let snapshot = Snapshot {
                users: seeded,
                ..Snapshot::default()
            };
            (snapshot, None)
        }
    };
    info!(
        users = snapshot.users.len(),
        hosts = snapshot.hosts.len(),
        regions = snapshot.regions.len(),
        estates = snapshot.estates.len(),
        "Loaded grid state"
    );

    let hub = NotificationHub::new(config.hub.capacity);
    let mut store = MemoryStore::from_snapshot(snapshot, hub.clone());
    if let Some(tx) = writes {
        store = store.with_persistence(tx);
    }
    let store = Arc::new(store);

    let nodes = NodeDirectory::new();
    let hosts = Arc::new(LocalHostOps::new(Arc::clone(&store), nodes.clone()));

    let (sessions, closing) = SessionRegistry::new();
    tokio::spawn(sessions.clone().run_cleanup(closing));

    let grid = Arc::new(Grid::new(
        store.clone(),
        hub,
        hosts,
        sessions,
        config.session.clone(),
    ));

    let identity = Arc::new(StaticTokens::new(config.auth.token.clone()));
    let (shutdown, _) = broadcast::channel(1);

    let node_listener = NodeListener::bind(
        config.listen.nodes,
        Arc::clone(&store),
        nodes,
        config.nodes.max_line_len,
        shutdown.clone(),
    )
    .await?;
    tokio::spawn(async move {
        if let Err(e) = node_listener.run().await {
            error!(error = %e, "Node listener failed");
        }
    });

    let gateway = Gateway::bind(
        config.listen.websocket,
        config.listen.allow_origins.clone(),
        grid,
        identity,
        shutdown.clone(),
    )
    .await?;

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
                let _ = shutdown.send(());
            }
        });
    }

    gateway.run().await?;
    info!("gridd stopped");
    Ok(())
}
