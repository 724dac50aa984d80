//! Loading pipeline
//!
//! Walks the song and log directories and loads every file into the
//! warehouse, one transaction per file:
//! - `songs` - Song metadata files (artists, songs)
//! - `logs` - Activity log files (time, users, songplays)
//! - `walker` - File discovery and the per-file loop
//! - `error` - Pipeline error type
//!
//! Songs must load before logs so songplays can resolve their song/artist ids.

pub mod error;
pub mod logs;
pub mod songs;
pub mod walker;

pub use error::LoadError;
pub use logs::LogFileLoader;
pub use songs::SongFileLoader;
pub use walker::{FileLoader, WalkSummary};

use std::fmt;
use std::path::Path;

use crate::core::config::LoadConfig;
use crate::data::WarehouseRepository;
use crate::data::types::TableCounts;

/// A pipeline stage: one input directory with its loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Songs,
    Logs,
}

/// Stage execution order
pub const STAGES: [Stage; 2] = [Stage::Songs, Stage::Logs];

impl Stage {
    pub fn loader(self) -> &'static dyn FileLoader {
        match self {
            Self::Songs => &SongFileLoader,
            Self::Logs => &LogFileLoader,
        }
    }

    /// Input directory of this stage
    pub fn root(self, config: &LoadConfig) -> &Path {
        match self {
            Self::Songs => config.song_data.as_path(),
            Self::Logs => config.log_data.as_path(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.loader().name())
    }
}

/// Result of a full pipeline run
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub stages: Vec<(Stage, WalkSummary)>,
    /// Row counts after the run
    pub counts: TableCounts,
}

impl PipelineReport {
    pub fn failed_files(&self) -> usize {
        self.stages.iter().map(|(_, s)| s.failed.len()).sum()
    }
}

pub struct Pipeline<'a> {
    repo: &'a dyn WarehouseRepository,
    config: &'a LoadConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(repo: &'a dyn WarehouseRepository, config: &'a LoadConfig) -> Self {
        Self { repo, config }
    }

    /// Ensure the schema exists, then run every stage in order
    pub async fn run(&self) -> Result<PipelineReport, LoadError> {
        self.repo.create_tables().await?;

        let mut stages = Vec::with_capacity(STAGES.len());
        for stage in STAGES {
            let root = stage.root(self.config);
            tracing::info!(
                stage = %stage,
                root = %root.display(),
                backend = self.repo.backend_name(),
                "Starting stage"
            );
            let summary =
                walker::process_directory(root, stage.loader(), self.repo, self.config.on_error)
                    .await?;
            stages.push((stage, summary));
        }

        let counts = self.repo.table_counts().await?;
        tracing::info!(
            songplays = counts.songplays,
            users = counts.users,
            songs = counts.songs,
            artists = counts.artists,
            time = counts.time,
            "Load complete"
        );
        Ok(PipelineReport { stages, counts })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::core::config::FailurePolicy;
    use crate::data::SqliteService;

    const SONG_JSON: &str = r#"{"num_songs":1,"artist_id":"AR1","artist_name":"Test Artist","artist_location":"NYC","artist_latitude":40.7,"artist_longitude":-74.0,"song_id":"S1","title":"Test Song","duration":180.5,"year":2000}"#;
    const EVENT_JSON: &str = r#"{"page":"NextSong","song":"Test Song","artist":"Test Artist","length":180.5,"ts":1541105830796,"userId":"1","level":"free","sessionId":100,"location":"NYC-NJ","userAgent":"UA"}"#;
    const HOME_JSON: &str = r#"{"page":"Home","song":null,"artist":null,"length":null,"ts":1541105820796,"userId":"1","level":"free","sessionId":100,"location":"NYC-NJ","userAgent":"UA"}"#;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: LoadConfig,
        repo: Arc<SqliteService>,
    }

    async fn fixture(songs: &[(&str, &str)], logs: &[(&str, &str)], on_error: FailurePolicy) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let song_data = dir.path().join("song_data/A/A/A");
        let log_data = dir.path().join("log_data/2018/11");
        fs::create_dir_all(&song_data).unwrap();
        fs::create_dir_all(&log_data).unwrap();
        for (name, content) in songs {
            fs::write(song_data.join(name), content).unwrap();
        }
        for (name, content) in logs {
            fs::write(log_data.join(name), content).unwrap();
        }

        let config = LoadConfig {
            song_data: dir.path().join("song_data"),
            log_data: dir.path().join("log_data"),
            on_error,
        };
        let repo = Arc::new(SqliteService::in_memory().await);
        Fixture {
            _dir: dir,
            config,
            repo,
        }
    }

    #[test]
    fn test_stage_order() {
        assert_eq!(STAGES, [Stage::Songs, Stage::Logs]);
        assert_eq!(Stage::Songs.to_string(), "songs");
        assert_eq!(Stage::Logs.to_string(), "logs");
    }

    #[test]
    fn test_stage_root() {
        let config = LoadConfig {
            song_data: PathBuf::from("s"),
            log_data: PathBuf::from("l"),
            on_error: FailurePolicy::Abort,
        };
        assert_eq!(Stage::Songs.root(&config), Path::new("s"));
        assert_eq!(Stage::Logs.root(&config), Path::new("l"));
    }

    #[tokio::test]
    async fn test_end_to_end_match() {
        let f = fixture(
            &[("TRAAAAW128F429D538.json", SONG_JSON)],
            &[("2018-11-01-events.json", EVENT_JSON)],
            FailurePolicy::Abort,
        )
        .await;

        let report = Pipeline::new(&f.repo, &f.config).run().await.unwrap();

        assert_eq!(report.stages.len(), 2);
        assert_eq!(report.stages[0].0, Stage::Songs);
        assert_eq!(report.stages[0].1.loaded, 1);
        assert_eq!(report.stages[1].0, Stage::Logs);
        assert_eq!(report.stages[1].1.loaded, 1);
        assert_eq!(report.failed_files(), 0);
        assert_eq!(
            report.counts,
            TableCounts {
                songplays: 1,
                users: 1,
                songs: 1,
                artists: 1,
                time: 1,
            }
        );

        let plays = f.repo.list_songplays().await.unwrap();
        assert_eq!(plays.len(), 1);
        assert_eq!(plays[0].song_id.as_deref(), Some("S1"));
        assert_eq!(plays[0].artist_id.as_deref(), Some("AR1"));
        assert_eq!(plays[0].user_id, 1);
        assert_eq!(plays[0].session_id, 100);
    }

    #[tokio::test]
    async fn test_log_without_song_plays() {
        let f = fixture(
            &[("song.json", SONG_JSON)],
            &[("events.json", HOME_JSON)],
            FailurePolicy::Abort,
        )
        .await;

        let report = Pipeline::new(&f.repo, &f.config).run().await.unwrap();

        assert_eq!(report.counts.songplays, 0);
        assert_eq!(report.counts.users, 0);
        assert_eq!(report.counts.time, 0);
        assert_eq!(report.counts.songs, 1);
    }

    #[tokio::test]
    async fn test_rerun_appends_songplays_only() {
        let f = fixture(
            &[("song.json", SONG_JSON)],
            &[("events.json", EVENT_JSON)],
            FailurePolicy::Abort,
        )
        .await;
        let pipeline = Pipeline::new(&f.repo, &f.config);

        pipeline.run().await.unwrap();
        let report = pipeline.run().await.unwrap();

        assert_eq!(report.counts.songs, 1);
        assert_eq!(report.counts.artists, 1);
        assert_eq!(report.counts.users, 1);
        assert_eq!(report.counts.time, 1);
        assert_eq!(report.counts.songplays, 2);
    }

    #[tokio::test]
    async fn test_skip_policy_reports_failed_files() {
        let f = fixture(
            &[("a.json", SONG_JSON), ("b.json", "not json")],
            &[("events.json", EVENT_JSON)],
            FailurePolicy::Skip,
        )
        .await;

        let report = Pipeline::new(&f.repo, &f.config).run().await.unwrap();

        assert_eq!(report.failed_files(), 1);
        assert_eq!(report.stages[0].1.found, 2);
        assert_eq!(report.counts.songplays, 1);
    }

    #[tokio::test]
    async fn test_abort_policy_stops_before_logs() {
        let f = fixture(
            &[("a.json", SONG_JSON), ("b.json", "not json")],
            &[("events.json", EVENT_JSON)],
            FailurePolicy::Abort,
        )
        .await;

        let err = Pipeline::new(&f.repo, &f.config).run().await.unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));

        let counts = f.repo.table_counts().await.unwrap();
        assert_eq!(counts.songs, 1);
        assert_eq!(counts.songplays, 0);
    }

    #[tokio::test]
    async fn test_missing_log_directory() {
        let f = fixture(&[("a.json", SONG_JSON)], &[], FailurePolicy::Abort).await;
        fs::remove_dir_all(&f.config.log_data).unwrap();

        let err = Pipeline::new(&f.repo, &f.config).run().await.unwrap_err();
        assert!(matches!(err, LoadError::MissingDirectory(_)));
    }
}
