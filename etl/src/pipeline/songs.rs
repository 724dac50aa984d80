//! Song file loader
//!
//! A song file holds exactly one JSON object describing one song and its
//! artist. It yields one artist row and one song row.

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;

use crate::data::WarehouseRepository;
use crate::data::types::{ArtistRow, SongBatch, SongRow};

use super::error::LoadError;
use super::walker::FileLoader;

#[derive(Debug, Deserialize)]
struct SongRecord {
    num_songs: i64,
    artist_id: String,
    artist_name: String,
    artist_location: Option<String>,
    artist_latitude: Option<f64>,
    artist_longitude: Option<f64>,
    song_id: String,
    title: String,
    duration: f64,
    year: i32,
}

impl From<SongRecord> for SongBatch {
    fn from(record: SongRecord) -> Self {
        let location = record.artist_location.filter(|l| !l.trim().is_empty());
        SongBatch {
            artist: ArtistRow {
                artist_id: record.artist_id.clone(),
                name: record.artist_name,
                location,
                latitude: record.artist_latitude,
                longitude: record.artist_longitude,
            },
            song: SongRow {
                song_id: record.song_id,
                title: record.title,
                artist_id: record.artist_id,
                year: record.year,
                duration: record.duration,
            },
        }
    }
}

/// Parse the contents of a song file
pub fn parse_song_record(path: &Path, content: &str) -> Result<SongBatch, LoadError> {
    let record: SongRecord = serde_json::from_str(content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        line: source.line(),
        source,
    })?;
    tracing::trace!(
        path = %path.display(),
        num_songs = record.num_songs,
        song_id = %record.song_id,
        "Parsed song record"
    );
    Ok(record.into())
}

/// Read and parse a song file
pub fn parse_song_file(path: &Path) -> Result<SongBatch, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_song_record(path, &content)
}

/// Loads one song file: artist then song, in one transaction
pub struct SongFileLoader;

#[async_trait]
impl FileLoader for SongFileLoader {
    fn name(&self) -> &'static str {
        "songs"
    }

    async fn load(&self, repo: &dyn WarehouseRepository, path: &Path) -> Result<(), LoadError> {
        let batch = parse_song_file(path)?;
        repo.write_song_batch(&batch)
            .await
            .map_err(|source| LoadError::Data {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            path = %path.display(),
            song_id = %batch.song.song_id,
            artist_id = %batch.artist.artist_id,
            "Records inserted for file"
        );
        Ok(())
    }
}
