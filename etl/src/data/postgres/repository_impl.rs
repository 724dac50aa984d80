//! WarehouseRepository trait implementation for PostgreSQL

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::WarehouseRepository;
use crate::data::types::{
    LogBatch, LogWriteSummary, SongBatch, SongMatch, SongplayRow, TableCounts,
};

use super::PostgresService;
use super::repositories::{logs, schema, songs, stats};

#[async_trait]
impl WarehouseRepository for Arc<PostgresService> {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    // ==================== Schema Operations ====================

    async fn drop_tables(&self) -> Result<(), DataError> {
        schema::drop_tables(self.pool()).await.map_err(Into::into)
    }

    async fn create_tables(&self) -> Result<(), DataError> {
        schema::create_tables(self.pool()).await.map_err(Into::into)
    }

    // ==================== Load Operations ====================

    async fn write_song_batch(&self, batch: &SongBatch) -> Result<(), DataError> {
        songs::write_song_batch(self.pool(), batch)
            .await
            .map_err(Into::into)
    }

    async fn write_log_batch(&self, batch: &LogBatch) -> Result<LogWriteSummary, DataError> {
        logs::write_log_batch(self.pool(), batch)
            .await
            .map_err(Into::into)
    }

    // ==================== Query Operations ====================

    async fn find_song(
        &self,
        title: &str,
        artist_name: &str,
        duration: f64,
    ) -> Result<Option<SongMatch>, DataError> {
        let mut conn = self.pool().acquire().await.map_err(DataError::Postgres)?;
        songs::find_song(&mut conn, title, artist_name, duration)
            .await
            .map_err(Into::into)
    }

    async fn table_counts(&self) -> Result<TableCounts, DataError> {
        stats::table_counts(self.pool()).await.map_err(Into::into)
    }

    async fn list_songplays(&self) -> Result<Vec<SongplayRow>, DataError> {
        stats::list_songplays(self.pool()).await.map_err(Into::into)
    }
}
