//! WarehouseRepository trait implementation for SQLite

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::WarehouseRepository;
use crate::data::types::{
    LogBatch, LogWriteSummary, SongBatch, SongMatch, SongplayRow, TableCounts,
};

use super::SqliteService;
use super::repositories::{logs, schema, songs, stats};

#[async_trait]
impl WarehouseRepository for Arc<SqliteService> {
    fn backend_name(&self) -> &'static str {
        "sqlite"
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
        let mut conn = self.pool().acquire().await.map_err(DataError::Sqlite)?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sqlite::schema::TABLES;
    use crate::data::types::{ArtistRow, SongRow};

    async fn repo() -> Arc<SqliteService> {
        Arc::new(SqliteService::in_memory().await)
    }

    #[tokio::test]
    async fn test_reset_schema_is_idempotent_and_empties_tables() {
        let repo = repo().await;
        repo.reset_schema().await.unwrap();
        repo.write_song_batch(&SongBatch {
            artist: ArtistRow {
                artist_id: "AR1".to_string(),
                name: "Test Artist".to_string(),
                location: None,
                latitude: None,
                longitude: None,
            },
            song: SongRow {
                song_id: "S1".to_string(),
                title: "Test Song".to_string(),
                artist_id: "AR1".to_string(),
                year: 2000,
                duration: 180.5,
            },
        })
        .await
        .unwrap();
        assert_eq!(repo.table_counts().await.unwrap().songs, 1);

        repo.reset_schema().await.unwrap();

        assert_eq!(repo.table_counts().await.unwrap(), TableCounts::default());
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(repo.pool())
        .await
        .unwrap();
        assert_eq!(tables.len(), TABLES.len());
        for table in TABLES {
            assert!(tables.iter().any(|t| t == table), "missing table {}", table);
        }
    }

    #[tokio::test]
    async fn test_find_song_through_trait() {
        let repo = repo().await;
        repo.create_tables().await.unwrap();
        assert!(
            repo.find_song("Nothing", "Nobody", 1.0)
                .await
                .unwrap()
                .is_none()
        );
        assert_eq!(repo.backend_name(), "sqlite");
    }
}
