//! Drop/create of the star-schema tables

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::sqlite::schema::{CREATE_TABLE_QUERIES, DROP_TABLE_QUERIES};

/// Drop all tables; each statement autocommits
pub async fn drop_tables(pool: &SqlitePool) -> Result<(), SqliteError> {
    for query in DROP_TABLE_QUERIES {
        sqlx::query(query).execute(pool).await?;
    }
    tracing::debug!(count = DROP_TABLE_QUERIES.len(), "Dropped SQLite tables");
    Ok(())
}

/// Create all tables and lookup indexes; each statement autocommits
pub async fn create_tables(pool: &SqlitePool) -> Result<(), SqliteError> {
    for query in CREATE_TABLE_QUERIES {
        sqlx::query(query).execute(pool).await?;
    }
    tracing::debug!(
        count = CREATE_TABLE_QUERIES.len(),
        "Created SQLite tables"
    );
    Ok(())
}
