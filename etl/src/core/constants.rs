// =============================================================================
// Application Identity
// =============================================================================

/// Crate name as it appears in log targets
pub const CRATE_LOG_TARGET: &str = "sparkify_etl";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "sparkify.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "SPARKIFY_CONFIG";

/// Environment variable for the log filter (falls back to RUST_LOG)
pub const ENV_LOG: &str = "SPARKIFY_LOG";

// =============================================================================
// Environment Variables - Database
// =============================================================================

/// Warehouse backend (postgres or sqlite)
pub const ENV_DB_BACKEND: &str = "SPARKIFY_DB_BACKEND";

pub const ENV_DB_HOST: &str = "SPARKIFY_DB_HOST";
pub const ENV_DB_PORT: &str = "SPARKIFY_DB_PORT";
pub const ENV_DB_NAME: &str = "SPARKIFY_DB_NAME";
pub const ENV_DB_USER: &str = "SPARKIFY_DB_USER";
pub const ENV_DB_PASSWORD: &str = "SPARKIFY_DB_PASSWORD";

/// Legacy password variable, honored as a fallback
pub const ENV_LEGACY_PASSWORD: &str = "PSQL_PASS";

/// SQLite database file (when using the sqlite backend)
pub const ENV_SQLITE_PATH: &str = "SPARKIFY_SQLITE_PATH";

// =============================================================================
// Environment Variables - Load
// =============================================================================

pub const ENV_SONG_DATA: &str = "SPARKIFY_SONG_DATA";
pub const ENV_LOG_DATA: &str = "SPARKIFY_LOG_DATA";
pub const ENV_ON_ERROR: &str = "SPARKIFY_ON_ERROR";

// =============================================================================
// Defaults
// =============================================================================

pub const DEFAULT_DB_HOST: &str = "127.0.0.1";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_NAME: &str = "sparkify";
pub const DEFAULT_DB_USER: &str = "postgres";

/// Database used to issue DROP/CREATE DATABASE
pub const DEFAULT_MAINTENANCE_DB: &str = "postgres";

pub const DEFAULT_SQLITE_PATH: &str = "sparkify.db";
pub const DEFAULT_SONG_DATA_DIR: &str = "data/song_data";
pub const DEFAULT_LOG_DATA_DIR: &str = "data/log_data";

// =============================================================================
// PostgreSQL Pool
// =============================================================================

/// The loader is sequential, a couple of connections is plenty
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 2;

pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Statement timeout in seconds (0 = disabled)
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// SQLite
// =============================================================================

pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 5;

/// Single writer, single logical thread of control
pub const SQLITE_MAX_CONNECTIONS: u32 = 1;

// =============================================================================
// Loading
// =============================================================================

/// `page` value that marks a song-play event in the activity logs
pub const SONG_PLAY_PAGE: &str = "NextSong";

/// Extension of the input files picked up by the directory walker
pub const DATA_FILE_EXTENSION: &str = "json";

/// Max rows per multi-row INSERT statement.
/// Keeps bind parameters well under SQLite's and PostgreSQL's limits.
pub const INSERT_BATCH_SIZE: usize = 500;
