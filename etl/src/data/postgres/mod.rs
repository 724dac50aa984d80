//! PostgreSQL warehouse service
//!
//! Production backend. Connection parameters come from `PostgresConfig`
//! (host, port, database, user, password); nothing is hardcoded here.

pub mod error;
pub mod repositories;
mod repository_impl;
pub mod schema;

pub use error::PostgresError;
pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, PgConnection};
use tracing::log::LevelFilter;

use crate::core::config::PostgresConfig;

/// PostgreSQL identifiers are truncated past this many bytes
const MAX_IDENTIFIER_LEN: usize = 63;

/// PostgreSQL warehouse service
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    /// Connect to the target database
    ///
    /// With `recreate_database`, first connects to the maintenance database
    /// and drops/creates the target database.
    pub async fn init(
        config: &PostgresConfig,
        recreate_database: bool,
    ) -> Result<Self, PostgresError> {
        validate_database_name(&config.database)?;
        if config.host.is_empty() {
            return Err(PostgresError::Config("PostgreSQL host is required".into()));
        }

        if recreate_database {
            Self::recreate_database(config).await?;
        }

        let mut options = connect_options(config, &config.database);
        options = options.log_statements(LevelFilter::Trace);

        // Set statement timeout at connection level for query protection
        if config.statement_timeout_secs > 0 {
            options = options.options([(
                "statement_timeout",
                format!("{}s", config.statement_timeout_secs),
            )]);
        }

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await?;

        tracing::debug!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            max_connections = config.max_connections,
            "PostgresService initialized"
        );
        Ok(Self { pool })
    }

    /// Drop and create the target database with UTF-8 encoding
    async fn recreate_database(config: &PostgresConfig) -> Result<(), PostgresError> {
        let options = connect_options(config, &config.maintenance_database);
        let mut conn = PgConnection::connect_with(&options).await?;
        let name = quote_identifier(&config.database);

        for statement in recreate_database_statements(&name) {
            sqlx::query(&statement).execute(&mut conn).await?;
        }
        conn.close().await?;

        tracing::info!(database = %config.database, "Recreated database");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the connection pool gracefully
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}

fn connect_options(config: &PostgresConfig, database: &str) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .database(database);
    match &config.password {
        Some(password) => options.password(password),
        None => options,
    }
}

fn recreate_database_statements(quoted_name: &str) -> [String; 2] {
    [
        format!("DROP DATABASE IF EXISTS {}", quoted_name),
        format!(
            "CREATE DATABASE {} WITH ENCODING 'UTF8' TEMPLATE template0",
            quoted_name
        ),
    ]
}

/// Database names end up in DDL, so only plain identifiers are accepted
fn validate_database_name(name: &str) -> Result<(), PostgresError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(PostgresError::Config(format!(
            "Invalid database name '{}': use letters, digits and underscores",
            name
        )))
    }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
