use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::config::{FailurePolicy, WarehouseBackend};
use super::constants::{
    ENV_CONFIG, ENV_DB_BACKEND, ENV_DB_HOST, ENV_DB_NAME, ENV_DB_PASSWORD, ENV_DB_PORT,
    ENV_DB_USER, ENV_LOG_DATA, ENV_ON_ERROR, ENV_SONG_DATA, ENV_SQLITE_PATH,
};

#[derive(Parser)]
#[command(name = "sparkify")]
#[command(version, about = "Load song metadata and activity logs into a star schema", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Warehouse backend (postgres or sqlite)
    #[arg(long, global = true, env = ENV_DB_BACKEND, value_parser = parse_warehouse_backend)]
    pub backend: Option<WarehouseBackend>,

    /// PostgreSQL host
    #[arg(long, global = true, env = ENV_DB_HOST)]
    pub db_host: Option<String>,

    /// PostgreSQL port
    #[arg(long, global = true, env = ENV_DB_PORT)]
    pub db_port: Option<u16>,

    /// PostgreSQL database name
    #[arg(long, global = true, env = ENV_DB_NAME)]
    pub db_name: Option<String>,

    /// PostgreSQL user
    #[arg(long, global = true, env = ENV_DB_USER)]
    pub db_user: Option<String>,

    /// PostgreSQL password
    #[arg(long, global = true, env = ENV_DB_PASSWORD, hide_env_values = true)]
    pub db_password: Option<String>,

    /// SQLite database file (when using the sqlite backend)
    #[arg(long, global = true, env = ENV_SQLITE_PATH)]
    pub sqlite_path: Option<PathBuf>,
}

/// Parse warehouse backend from CLI/env string
fn parse_warehouse_backend(s: &str) -> Result<WarehouseBackend, String> {
    match s.to_lowercase().as_str() {
        "postgres" | "postgresql" => Ok(WarehouseBackend::Postgres),
        "sqlite" => Ok(WarehouseBackend::Sqlite),
        _ => Err(format!(
            "Invalid warehouse backend '{}'. Valid options: postgres, sqlite",
            s
        )),
    }
}

/// Parse failure policy from CLI/env string
fn parse_failure_policy(s: &str) -> Result<FailurePolicy, String> {
    match s.to_lowercase().as_str() {
        "abort" => Ok(FailurePolicy::Abort),
        "skip" => Ok(FailurePolicy::Skip),
        _ => Err(format!(
            "Invalid failure policy '{}'. Valid options: abort, skip",
            s
        )),
    }
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Drop and recreate the star schema tables. Destroys existing data.
    Bootstrap {
        /// Drop and recreate the whole database before creating the tables
        #[arg(long)]
        recreate_database: bool,
    },
    /// Load song files, then activity log files
    Load {
        /// Root directory of the song metadata files
        #[arg(long, env = ENV_SONG_DATA)]
        song_data: Option<PathBuf>,

        /// Root directory of the activity log files
        #[arg(long, env = ENV_LOG_DATA)]
        log_data: Option<PathBuf>,

        /// What to do when a file fails to load (abort or skip)
        #[arg(long, env = ENV_ON_ERROR, value_parser = parse_failure_policy)]
        on_error: Option<FailurePolicy>,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub config: Option<PathBuf>,
    pub backend: Option<WarehouseBackend>,
    pub db_host: Option<String>,
    pub db_port: Option<u16>,
    pub db_name: Option<String>,
    pub db_user: Option<String>,
    pub db_password: Option<String>,
    pub sqlite_path: Option<PathBuf>,
    pub song_data: Option<PathBuf>,
    pub log_data: Option<PathBuf>,
    pub on_error: Option<FailurePolicy>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        let (song_data, log_data, on_error) = match &cli.command {
            Commands::Load {
                song_data,
                log_data,
                on_error,
            } => (song_data.clone(), log_data.clone(), *on_error),
            Commands::Bootstrap { .. } => (None, None, None),
        };
        Self {
            config: cli.config,
            backend: cli.backend,
            db_host: cli.db_host,
            db_port: cli.db_port,
            db_name: cli.db_name,
            db_user: cli.db_user,
            db_password: cli.db_password,
            sqlite_path: cli.sqlite_path,
            song_data,
            log_data,
            on_error,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Commands) {
    let cli = Cli::parse();
    let command = cli.command.clone();
    (CliConfig::from(cli), command)
}
