//! SQLite warehouse service
//!
//! Embedded backend for local runs and tests. A single connection is
//! enough: the loader has one logical thread of control and SQLite has
//! one writer anyway.

pub mod error;
pub mod repositories;
mod repository_impl;
pub mod schema;

pub use error::SqliteError;
pub use sqlx::SqlitePool;

use std::path::Path;
use std::time::Duration;

use sqlx::ConnectOptions;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use tracing::log::LevelFilter;

use crate::core::config::SqliteConfig;
use crate::core::constants::{SQLITE_BUSY_TIMEOUT_SECS, SQLITE_MAX_CONNECTIONS};

/// SQLite warehouse service
pub struct SqliteService {
    pool: SqlitePool,
}

impl SqliteService {
    /// Open (creating if missing) the database file
    ///
    /// With `recreate_database`, the file and its WAL/SHM companions are
    /// removed first, the SQLite analogue of DROP/CREATE DATABASE.
    pub async fn init(config: &SqliteConfig, recreate_database: bool) -> Result<Self, SqliteError> {
        let db_path = config.path.as_path();

        if recreate_database {
            remove_database_files(db_path)?;
        }

        if let Some(parent) = db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(SQLITE_BUSY_TIMEOUT_SECS))
            .log_statements(LevelFilter::Trace);

        let pool = SqlitePoolOptions::new()
            .max_connections(SQLITE_MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        tracing::debug!(path = %db_path.display(), "SqliteService initialized");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// In-memory database on a single pinned connection (for testing)
    #[cfg(test)]
    pub async fn in_memory() -> Self {
        use std::str::FromStr;

        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        Self { pool }
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("SQLite pool closed");
    }
}

/// Remove a database file along with its WAL and SHM files
fn remove_database_files(db_path: &Path) -> Result<(), SqliteError> {
    let mut candidates = vec![db_path.to_path_buf()];
    for suffix in ["-wal", "-shm"] {
        let mut name = db_path.as_os_str().to_owned();
        name.push(suffix);
        candidates.push(name.into());
    }

    for path in candidates {
        match std::fs::remove_file(&path) {
            Ok(()) => tracing::debug!(path = %path.display(), "Removed database file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_database_files() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("warehouse.db");
        std::fs::write(&db, b"x").unwrap();
        std::fs::write(dir.path().join("warehouse.db-wal"), b"x").unwrap();

        remove_database_files(&db).unwrap();

        assert!(!db.exists());
        assert!(!dir.path().join("warehouse.db-wal").exists());
    }

    #[test]
    fn test_remove_missing_database_files_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        remove_database_files(&dir.path().join("missing.db")).unwrap();
    }

    #[tokio::test]
    async fn test_init_creates_file_and_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("warehouse.db");
        let config = SqliteConfig { path: path.clone() };

        let service = SqliteService::init(&config, false).await.unwrap();
        sqlx::query("SELECT 1").execute(service.pool()).await.unwrap();
        service.close().await;

        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_init_recreate_discards_existing_data() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig {
            path: dir.path().join("warehouse.db"),
        };

        let service = SqliteService::init(&config, false).await.unwrap();
        sqlx::query("CREATE TABLE leftover (id INTEGER)")
            .execute(service.pool())
            .await
            .unwrap();
        service.close().await;

        let service = SqliteService::init(&config, true).await.unwrap();
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'leftover'",
        )
        .fetch_one(service.pool())
        .await
        .unwrap();
        service.close().await;

        assert_eq!(count, 0);
    }
}
