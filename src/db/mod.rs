//! Database module for persistent storage.
//!
//! Async SQLite access through SQLx. The grid is read once at startup into
//! the in-memory store; afterwards every store mutation is replayed here by
//! the [`writer`] task.

mod grid;
pub mod writer;

pub use grid::GridRepository;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Distinguishes in-memory databases opened by one process.
static MEMORY_DBS: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("integrity check failed: {0}")]
    Integrity(String),
}

/// Pooled handle to the grid database.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);
    const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

    /// Open (or create) the database at `path` and bring its schema up to
    /// date. `":memory:"` opens a private in-memory database.
    pub async fn new(path: &str) -> Result<Self, DbError> {
        let (options, max_connections) = Self::options(path);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Self::ACQUIRE_TIMEOUT)
            .idle_timeout(Some(Self::IDLE_TIMEOUT))
            .test_before_acquire(true)
            .connect_with(options)
            .await?;
        info!(%path, "Database connected");

        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations checked/applied");

        Self::check_integrity(&pool).await?;
        Ok(Self { pool })
    }

    fn options(path: &str) -> (SqliteConnectOptions, u32) {
        let base = SqliteConnectOptions::new()
            .create_if_missing(true)
            .foreign_keys(true);

        if path == ":memory:" {
            // One connection keeps the shared-cache database alive; the
            // unique name keeps parallel tests apart.
            let n = MEMORY_DBS.fetch_add(1, Ordering::Relaxed);
            let uri = format!(
                "file:gridd-{}-{n}?mode=memory&cache=shared",
                std::process::id()
            );
            return (base.filename(uri).shared_cache(true), 1);
        }

        if let Some(dir) = Path::new(path).parent()
            && !dir.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(dir)
        {
            warn!(path = %dir.display(), error = %e, "Failed to create database directory");
        }
        let options = base
            .filename(path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);
        (options, 5)
    }

    async fn check_integrity(pool: &SqlitePool) -> Result<(), DbError> {
        let verdict: String = sqlx::query_scalar("PRAGMA integrity_check")
            .fetch_one(pool)
            .await?;
        if verdict == "ok" {
            return Ok(());
        }
        error!(integrity_check = %verdict, "Database integrity check failed");
        Err(DbError::Integrity(verdict))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Repository over the grid entity tables.
    pub fn grid(&self) -> GridRepository<'_> {
        GridRepository::new(&self.pool)
    }
}
