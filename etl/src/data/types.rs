//! Row types shared by all warehouse backends
//!
//! These are produced by the file loaders in `pipeline` and written by the
//! repository implementations. Timestamps are epoch milliseconds (UTC).

/// Artist dimension row
#[derive(Debug, Clone, PartialEq)]
pub struct ArtistRow {
    pub artist_id: String,
    pub name: String,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Song dimension row
#[derive(Debug, Clone, PartialEq)]
pub struct SongRow {
    pub song_id: String,
    pub title: String,
    pub artist_id: String,
    pub year: i32,
    pub duration: f64,
}

/// User dimension row
#[derive(Debug, Clone, PartialEq)]
pub struct UserRow {
    pub user_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub gender: Option<String>,
    pub level: String,
}

/// Time dimension row, one per distinct event instant
#[derive(Debug, Clone, PartialEq)]
pub struct TimeRow {
    pub start_time: i64,
    pub hour: i32,
    pub day: i32,
    /// ISO week of the year
    pub week: i32,
    pub month: i32,
    pub year: i32,
    /// English weekday name, e.g. "Monday"
    pub weekday: String,
}

/// A song-play event before song/artist resolution
#[derive(Debug, Clone, PartialEq)]
pub struct SongplayEvent {
    pub start_time: i64,
    pub user_id: i64,
    pub level: String,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
    /// Lookup key: song title
    pub song: Option<String>,
    /// Lookup key: artist name
    pub artist: Option<String>,
    /// Lookup key: track length in seconds
    pub length: Option<f64>,
}

impl SongplayEvent {
    /// Lookup key, if the event carries all three parts
    pub fn lookup_key(&self) -> Option<(&str, &str, f64)> {
        match (&self.song, &self.artist, self.length) {
            (Some(song), Some(artist), Some(length)) => Some((song, artist, length)),
            _ => None,
        }
    }
}

/// Song/artist ids resolved for a songplay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongMatch {
    pub song_id: String,
    pub artist_id: String,
}

/// Persisted songplay fact row
#[derive(Debug, Clone, PartialEq)]
pub struct SongplayRow {
    pub songplay_id: i64,
    pub start_time: i64,
    pub user_id: i64,
    pub level: String,
    pub song_id: Option<String>,
    pub artist_id: Option<String>,
    pub session_id: i64,
    pub location: Option<String>,
    pub user_agent: Option<String>,
}

/// Rows derived from one song file, written in one transaction
#[derive(Debug, Clone, PartialEq)]
pub struct SongBatch {
    pub artist: ArtistRow,
    pub song: SongRow,
}

/// Rows derived from one log file, written in one transaction
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBatch {
    pub time: Vec<TimeRow>,
    pub users: Vec<UserRow>,
    pub songplays: Vec<SongplayEvent>,
}

impl LogBatch {
    pub fn is_empty(&self) -> bool {
        self.time.is_empty() && self.users.is_empty() && self.songplays.is_empty()
    }
}

/// Outcome of writing a log batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogWriteSummary {
    pub songplays: u64,
    /// Songplays whose song/artist were found
    pub matched: u64,
}

/// Row counts of the five star-schema tables
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableCounts {
    pub songplays: i64,
    pub users: i64,
    pub songs: i64,
    pub artists: i64,
    pub time: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(song: Option<&str>, artist: Option<&str>, length: Option<f64>) -> SongplayEvent {
        SongplayEvent {
            start_time: 0,
            user_id: 1,
            level: "free".to_string(),
            session_id: 1,
            location: None,
            user_agent: None,
            song: song.map(String::from),
            artist: artist.map(String::from),
            length,
        }
    }

    #[test]
    fn test_lookup_key_complete() {
        let e = event(Some("Song"), Some("Artist"), Some(200.5));
        assert_eq!(e.lookup_key(), Some(("Song", "Artist", 200.5)));
    }

    #[test]
    fn test_lookup_key_incomplete() {
        assert!(event(None, Some("Artist"), Some(1.0)).lookup_key().is_none());
        assert!(event(Some("Song"), None, Some(1.0)).lookup_key().is_none());
        assert!(event(Some("Song"), Some("Artist"), None).lookup_key().is_none());
    }

    #[test]
    fn test_empty_log_batch() {
        assert!(LogBatch::default().is_empty());
    }
}
