//! Write-behind task replaying store mutations into the database.

use super::{Database, DbError};
use crate::state::StoreWrite;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Apply writes in arrival order until every sender is gone.
///
/// A failed write is logged and skipped; the in-memory store stays
/// authoritative for the running process.
pub async fn run(db: Database, mut rx: mpsc::UnboundedReceiver<StoreWrite>) {
    info!("database writer started");
    while let Some(write) = rx.recv().await {
        if let Err(e) = apply(&db, &write).await {
            warn!(error = %e, "failed to persist change");
        }
    }
    debug!("database writer stopped");
}

/// Apply one write.
pub async fn apply(db: &Database, write: &StoreWrite) -> Result<(), DbError> {
    let repo = db.grid();
    match write {
        StoreWrite::UpsertHost(host) => repo.upsert_host(host).await,
        StoreWrite::DeleteHost(id) => repo.delete_host(*id).await,
        StoreWrite::UpsertRegion(region) => repo.upsert_region(region).await,
        StoreWrite::UpsertEstate(estate) => repo.upsert_estate(estate).await,
        StoreWrite::DeleteJob(id) => repo.delete_job(*id).await,
        StoreWrite::SetPassword { user, hash } => repo.set_password(*user, hash).await,
    }
}
