//! Repository trait for warehouse backends
//!
//! Defines the unified interface the loaders write through. Each backend
//! (PostgreSQL, SQLite) implements it with its own SQL dialect.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{
    LogBatch, LogWriteSummary, SongBatch, SongMatch, SongplayRow, TableCounts,
};

/// Repository trait for star-schema operations
///
/// Implemented by the SQLite and PostgreSQL backends.
#[async_trait]
pub trait WarehouseRepository: Send + Sync {
    /// Short backend name for logs
    fn backend_name(&self) -> &'static str;

    // ==================== Schema Operations ====================

    /// Drop the five star-schema tables, fact table first.
    /// Each statement commits independently; the first failure aborts the rest.
    async fn drop_tables(&self) -> Result<(), DataError>;

    /// Create the five star-schema tables if they don't exist, dimensions first
    async fn create_tables(&self) -> Result<(), DataError>;

    /// Drop then recreate all tables, leaving them empty
    async fn reset_schema(&self) -> Result<(), DataError> {
        self.drop_tables().await?;
        self.create_tables().await
    }

    // ==================== Load Operations ====================

    /// Write the artist then the song of one song file, in one transaction
    async fn write_song_batch(&self, batch: &SongBatch) -> Result<(), DataError>;

    /// Write time rows, user rows, then songplays (resolving song/artist ids)
    /// of one log file, in one transaction
    async fn write_log_batch(&self, batch: &LogBatch) -> Result<LogWriteSummary, DataError>;

    // ==================== Query Operations ====================
    //
    // Read helpers for inspecting a finished load. The loaders resolve
    // songplays inside their own transaction and do not go through these.

    /// Find the song/artist pair matching title, artist name and duration exactly
    async fn find_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>, DataError>;

    /// Row counts of the five tables
    async fn table_counts(&self) -> Result<TableCounts, DataError>;

    /// All songplays ordered by id
    async fn list_songplays(&self) -> Result<Vec<SongplayRow>, DataError>;
}
