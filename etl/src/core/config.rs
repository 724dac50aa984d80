use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::cli::CliConfig;
use super::constants::{
    CONFIG_FILE_NAME, DEFAULT_DB_HOST, DEFAULT_DB_NAME, DEFAULT_DB_PORT, DEFAULT_DB_USER,
    DEFAULT_LOG_DATA_DIR, DEFAULT_MAINTENANCE_DB, DEFAULT_SONG_DATA_DIR, DEFAULT_SQLITE_PATH,
    ENV_LEGACY_PASSWORD, POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_MAX_CONNECTIONS,
    POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
};

// =============================================================================
// Warehouse Backend Enum (PostgreSQL or SQLite)
// =============================================================================

/// Relational backend the star schema is loaded into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarehouseBackend {
    #[default]
    Postgres,
    Sqlite,
}

impl fmt::Display for WarehouseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarehouseBackend::Postgres => write!(f, "postgres"),
            WarehouseBackend::Sqlite => write!(f, "sqlite"),
        }
    }
}

// =============================================================================
// Failure Policy Enum
// =============================================================================

/// What the directory walker does when a single file fails to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop the run at the first failing file
    #[default]
    Abort,
    /// Roll back the failing file, log it and continue with the next one
    Skip,
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Abort => write!(f, "abort"),
            FailurePolicy::Skip => write!(f, "skip"),
        }
    }
}

// =============================================================================
// File Config (JSON)
// =============================================================================

/// PostgreSQL section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostgresFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub maintenance_database: Option<String>,
    pub max_connections: Option<u32>,
    pub acquire_timeout_secs: Option<u64>,
    pub statement_timeout_secs: Option<u64>,
}

/// SQLite section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SqliteFileConfig {
    pub path: Option<PathBuf>,
}

/// Database section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub backend: Option<WarehouseBackend>,
    pub postgres: Option<PostgresFileConfig>,
    pub sqlite: Option<SqliteFileConfig>,
}

/// Load section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LoadFileConfig {
    pub song_data: Option<PathBuf>,
    pub log_data: Option<PathBuf>,
    pub on_error: Option<FailurePolicy>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub database: Option<DatabaseFileConfig>,
    pub load: Option<LoadFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    fn parse(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.warn_unknown_fields();
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }
}

// =============================================================================
// Runtime Config
// =============================================================================

/// PostgreSQL configuration (final/runtime)
#[derive(Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    /// Target database holding the star schema
    pub database: String,
    pub user: String,
    pub password: Option<String>,
    /// Database we connect to when dropping/creating the target database
    pub maintenance_database: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// Statement timeout in seconds (0 = disabled)
    pub statement_timeout_secs: u64,
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("maintenance_database", &self.maintenance_database)
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("statement_timeout_secs", &self.statement_timeout_secs)
            .finish()
    }
}

/// SQLite configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    pub path: PathBuf,
}

/// Database configuration (final/runtime)
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: WarehouseBackend,
    /// Only populated if backend = postgres
    pub postgres: Option<PostgresConfig>,
    /// Only populated if backend = sqlite
    pub sqlite: Option<SqliteConfig>,
}

/// Input directories and failure policy for the load command
#[derive(Debug, Clone)]
pub struct LoadConfig {
    pub song_data: PathBuf,
    pub log_data: PathBuf,
    pub on_error: FailurePolicy,
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub load: LoadConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. CLI-specified config path OR local `sparkify.json`
    /// 3. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let config_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        let file_config = match config_path {
            Some(path) => FileConfig::load_from_file(&path)?,
            None => FileConfig::default(),
        };

        let legacy_password = std::env::var(ENV_LEGACY_PASSWORD).ok();
        Ok(Self::from_sources(cli, file_config, legacy_password))
    }

    /// Layer defaults -> file config -> CLI/env overrides
    fn from_sources(
        cli: &CliConfig,
        file_config: FileConfig,
        legacy_password: Option<String>,
    ) -> Self {
        let file_database = file_config.database.unwrap_or_default();
        let file_load = file_config.load.unwrap_or_default();

        let backend = cli.backend.or(file_database.backend).unwrap_or_default();

        let postgres = if backend == WarehouseBackend::Postgres {
            let file_pg = file_database.postgres.unwrap_or_default();
            Some(PostgresConfig {
                host: cli
                    .db_host
                    .clone()
                    .or(file_pg.host)
                    .unwrap_or_else(|| DEFAULT_DB_HOST.to_string()),
                port: cli.db_port.or(file_pg.port).unwrap_or(DEFAULT_DB_PORT),
                database: cli
                    .db_name
                    .clone()
                    .or(file_pg.database)
                    .unwrap_or_else(|| DEFAULT_DB_NAME.to_string()),
                user: cli
                    .db_user
                    .clone()
                    .or(file_pg.user)
                    .unwrap_or_else(|| DEFAULT_DB_USER.to_string()),
                password: cli
                    .db_password
                    .clone()
                    .or(file_pg.password)
                    .or(legacy_password),
                maintenance_database: file_pg
                    .maintenance_database
                    .unwrap_or_else(|| DEFAULT_MAINTENANCE_DB.to_string()),
                max_connections: file_pg
                    .max_connections
                    .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
                acquire_timeout_secs: file_pg
                    .acquire_timeout_secs
                    .unwrap_or(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS),
                statement_timeout_secs: file_pg
                    .statement_timeout_secs
                    .unwrap_or(POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
            })
        } else {
            None
        };

        let sqlite = if backend == WarehouseBackend::Sqlite {
            let file_sqlite = file_database.sqlite.unwrap_or_default();
            Some(SqliteConfig {
                path: cli
                    .sqlite_path
                    .clone()
                    .or(file_sqlite.path)
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_SQLITE_PATH)),
            })
        } else {
            None
        };

        let load = LoadConfig {
            song_data: cli
                .song_data
                .clone()
                .or(file_load.song_data)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SONG_DATA_DIR)),
            log_data: cli
                .log_data
                .clone()
                .or(file_load.log_data)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DATA_DIR)),
            on_error: cli.on_error.or(file_load.on_error).unwrap_or_default(),
        };

        let config = Self {
            database: DatabaseConfig {
                backend,
                postgres,
                sqlite,
            },
            load,
        };
        tracing::trace!(config = ?config, "Resolved configuration");
        config
    }
}
