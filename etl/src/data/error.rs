//! Unified error type for data layer
//!
//! Wraps the backend-specific errors (PostgreSQL, SQLite) while keeping
//! track of which backend produced them.

use thiserror::Error;

use super::postgres::PostgresError;
use super::sqlite::SqliteError;

/// Unified error type for data layer operations
#[derive(Error, Debug)]
pub enum DataError {
    /// SQLite database error
    #[error("SQLite error: {0}")]
    Sqlite(sqlx::Error),

    /// PostgreSQL database error
    #[error("PostgreSQL error: {0}")]
    Postgres(sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DataError {
    /// Check if this error is a constraint violation (duplicate key, foreign key)
    pub fn is_constraint_violation(&self) -> bool {
        match self {
            Self::Sqlite(sqlx::Error::Database(e)) | Self::Postgres(sqlx::Error::Database(e)) => {
                e.is_unique_violation() || e.is_foreign_key_violation() || e.is_check_violation()
            }
            _ => false,
        }
    }
}

impl From<SqliteError> for DataError {
    fn from(e: SqliteError) -> Self {
        match e {
            SqliteError::Database(e) => Self::Sqlite(e),
            SqliteError::Io(e) => Self::Io(e),
        }
    }
}

impl From<PostgresError> for DataError {
    fn from(e: PostgresError) -> Self {
        match e {
            PostgresError::Database(e) => Self::Postgres(e),
            PostgresError::Config(msg) => Self::Config(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = DataError::Config("missing host".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing host");
    }

    #[test]
    fn test_from_postgres_config_error() {
        let err: DataError = PostgresError::Config("bad name".to_string()).into();
        assert!(matches!(err, DataError::Config(ref msg) if msg == "bad name"));
    }

    #[test]
    fn test_non_database_error_is_not_constraint_violation() {
        assert!(!DataError::Sqlite(sqlx::Error::RowNotFound).is_constraint_violation());
    }
}
