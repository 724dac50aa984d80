//! Log file loader
//!
//! A log file is newline-delimited JSON, one user-activity event per line.
//! Only song-play events (`page == "NextSong"`) are kept. Each one yields a
//! time row, a user row and a songplay fact row.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Deserializer};

use crate::core::constants::SONG_PLAY_PAGE;
use crate::data::WarehouseRepository;
use crate::data::types::{LogBatch, SongplayEvent, TimeRow, UserRow};

use super::error::LoadError;
use super::walker::FileLoader;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogEvent {
    page: Option<String>,
    ts: Option<i64>,
    #[serde(default, deserialize_with = "lenient_id")]
    user_id: Option<i64>,
    first_name: Option<String>,
    last_name: Option<String>,
    gender: Option<String>,
    level: Option<String>,
    #[serde(default, deserialize_with = "lenient_id")]
    session_id: Option<i64>,
    location: Option<String>,
    user_agent: Option<String>,
    song: Option<String>,
    artist: Option<String>,
    length: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

/// Ids show up as numbers or numeric strings; logged-out events carry ""
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawId>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawId::Number(n)) => Ok(Some(n)),
        Some(RawId::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(RawId::Text(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("invalid id '{}'", s))),
    }
}

/// Break an epoch-millisecond timestamp into time dimension attributes (UTC)
pub fn time_row(start_time: i64) -> Option<TimeRow> {
    let t = DateTime::<Utc>::from_timestamp_millis(start_time)?;
    Some(TimeRow {
        start_time,
        hour: t.hour() as i32,
        day: t.day() as i32,
        week: t.iso_week().week() as i32,
        month: t.month() as i32,
        year: t.year(),
        weekday: t.format("%A").to_string(),
    })
}

fn required<T>(value: Option<T>, path: &Path, line: usize, field: &'static str) -> Result<T, LoadError> {
    value.ok_or_else(|| LoadError::MissingField {
        path: path.to_path_buf(),
        line,
        field,
    })
}

/// Parse the contents of a log file into the rows to write
///
/// Time rows are deduplicated by instant (first occurrence kept) and user
/// rows by id (last occurrence wins, position of the first kept). Songplays
/// are kept one per event.
pub fn parse_log_lines(path: &Path, content: &str) -> Result<LogBatch, LoadError> {
    let mut batch = LogBatch::default();
    let mut seen_times: HashSet<i64> = HashSet::new();
    let mut user_index: HashMap<i64, usize> = HashMap::new();
    let mut skipped = 0usize;

    for (index, raw) in content.lines().enumerate() {
        let line = index + 1;
        if raw.trim().is_empty() {
            continue;
        }

        let event: LogEvent = serde_json::from_str(raw).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            line,
            source,
        })?;

        if event.page.as_deref() != Some(SONG_PLAY_PAGE) {
            skipped += 1;
            continue;
        }

        let ts = required(event.ts, path, line, "ts")?;
        let user_id = required(event.user_id, path, line, "userId")?;
        let level = required(event.level, path, line, "level")?;
        let session_id = required(event.session_id, path, line, "sessionId")?;

        let time = time_row(ts).ok_or_else(|| LoadError::InvalidTimestamp {
            path: path.to_path_buf(),
            line,
            ts,
        })?;
        if seen_times.insert(ts) {
            batch.time.push(time);
        }

        let user = UserRow {
            user_id,
            first_name: event.first_name,
            last_name: event.last_name,
            gender: event.gender,
            level: level.clone(),
        };
        match user_index.get(&user_id) {
            Some(&i) => batch.users[i] = user,
            None => {
                user_index.insert(user_id, batch.users.len());
                batch.users.push(user);
            }
        }

        batch.songplays.push(SongplayEvent {
            start_time: ts,
            user_id,
            level,
            session_id,
            location: event.location,
            user_agent: event.user_agent,
            song: event.song,
            artist: event.artist,
            length: event.length,
        });
    }

    tracing::trace!(
        path = %path.display(),
        songplays = batch.songplays.len(),
        skipped,
        "Parsed log file"
    );
    Ok(batch)
}

/// Read and parse a log file
pub fn parse_log_file(path: &Path) -> Result<LogBatch, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_log_lines(path, &content)
}

/// Loads one log file: time, users, then songplays, in one transaction
pub struct LogFileLoader;

#[async_trait]
impl FileLoader for LogFileLoader {
    fn name(&self) -> &'static str {
        "logs"
    }

    async fn load(&self, repo: &dyn WarehouseRepository, path: &Path) -> Result<(), LoadError> {
        let batch = parse_log_file(path)?;
        if batch.is_empty() {
            tracing::debug!(path = %path.display(), "No song plays in file");
            return Ok(());
        }

        let summary = repo
            .write_log_batch(&batch)
            .await
            .map_err(|source| LoadError::Data {
                path: path.to_path_buf(),
                source,
            })?;
        tracing::debug!(
            path = %path.display(),
            time_rows = batch.time.len(),
            users = batch.users.len(),
            songplays = summary.songplays,
            matched = summary.matched,
            "Records inserted for file"
        );
        Ok(())
    }
}
