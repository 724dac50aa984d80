//! Pipeline error types

use std::path::PathBuf;

use thiserror::Error;

use crate::data::DataError;

/// Errors raised while discovering, parsing or writing input files
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid JSON in {} (line {line}): {source}", .path.display())]
    Json {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("Missing field '{field}' in {} (line {line})", .path.display())]
    MissingField {
        path: PathBuf,
        line: usize,
        field: &'static str,
    },

    #[error("Timestamp {ts} out of range in {} (line {line})", .path.display())]
    InvalidTimestamp { path: PathBuf, line: usize, ts: i64 },

    #[error("Directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("Failed to walk {}: {source}", .root.display())]
    Walk {
        root: PathBuf,
        source: walkdir::Error,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Data { path: PathBuf, source: DataError },

    #[error(transparent)]
    Warehouse(#[from] DataError),
}

impl LoadError {
    /// File the error is attributed to, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. }
            | Self::Json { path, .. }
            | Self::MissingField { path, .. }
            | Self::InvalidTimestamp { path, .. }
            | Self::Data { path, .. } => Some(path),
            Self::MissingDirectory(_) | Self::Walk { .. } | Self::Warehouse(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = LoadError::MissingField {
            path: PathBuf::from("log_data/2018-11-01-events.json"),
            line: 3,
            field: "userId",
        };
        assert_eq!(
            err.to_string(),
            "Missing field 'userId' in log_data/2018-11-01-events.json (line 3)"
        );
    }

    #[test]
    fn test_missing_directory_display() {
        let err = LoadError::MissingDirectory(PathBuf::from("data/song_data"));
        assert_eq!(err.to_string(), "Directory not found: data/song_data");
        assert!(err.path().is_none());
    }

    #[test]
    fn test_data_error_keeps_path() {
        let err = LoadError::Data {
            path: PathBuf::from("a.json"),
            source: DataError::Config("x".to_string()),
        };
        assert_eq!(err.path(), Some(&PathBuf::from("a.json")));
        assert_eq!(
            err.to_string(),
            "Failed to write a.json: Configuration error: x"
        );
    }
}
