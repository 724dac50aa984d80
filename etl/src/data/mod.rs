//! Data storage layer
//!
//! Provides the warehouse the loaders write into:
//! - `postgres` - Production backend
//! - `sqlite` - Embedded backend for local runs and tests
//! - `types` - Row types shared across backends
//! - `traits` - Repository trait implemented by each backend
//! - `error` - Unified error type for all backends

pub mod error;
pub mod postgres;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use postgres::PostgresService;
pub use sqlite::SqliteService;

pub use error::DataError;
pub use traits::WarehouseRepository;

use std::sync::Arc;

use crate::core::config::{DatabaseConfig, WarehouseBackend};

/// Warehouse database service enum
///
/// Wraps the backend-specific service (PostgreSQL or SQLite) selected by
/// configuration.
pub enum WarehouseService {
    /// PostgreSQL backend (default)
    Postgres(Arc<PostgresService>),
    /// SQLite backend (embedded)
    Sqlite(Arc<SqliteService>),
}

impl WarehouseService {
    /// Connect to the configured backend
    ///
    /// With `recreate_database`, the target database is dropped and
    /// recreated before connecting. Connection failures are fatal: no retry.
    pub async fn init(config: &DatabaseConfig, recreate_database: bool) -> Result<Self, DataError> {
        match config.backend {
            WarehouseBackend::Postgres => {
                let pg = config.postgres.as_ref().ok_or_else(|| {
                    DataError::Config("PostgreSQL configuration required".to_string())
                })?;
                let service = PostgresService::init(pg, recreate_database).await?;
                Ok(Self::Postgres(Arc::new(service)))
            }
            WarehouseBackend::Sqlite => {
                let sqlite = config.sqlite.as_ref().ok_or_else(|| {
                    DataError::Config("SQLite configuration required".to_string())
                })?;
                let service = SqliteService::init(sqlite, recreate_database).await?;
                Ok(Self::Sqlite(Arc::new(service)))
            }
        }
    }

    /// Close the database connection gracefully
    pub async fn close(&self) {
        match self {
            Self::Postgres(p) => p.close().await,
            Self::Sqlite(s) => s.close().await,
        }
    }

    /// Get the backend type
    pub fn backend(&self) -> WarehouseBackend {
        match self {
            Self::Postgres(_) => WarehouseBackend::Postgres,
            Self::Sqlite(_) => WarehouseBackend::Sqlite,
        }
    }

    /// Get the repository trait object for data operations
    pub fn repository(&self) -> Box<dyn WarehouseRepository + Send + Sync> {
        match self {
            Self::Postgres(p) => Box::new(Arc::clone(p)),
            Self::Sqlite(s) => Box::new(Arc::clone(s)),
        }
    }
}
