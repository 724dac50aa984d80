//! Core application

use anyhow::{Context, Result};

use crate::core::cli::{self, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{CRATE_LOG_TARGET, ENV_LOG};
use crate::data::WarehouseService;
use crate::pipeline::{Pipeline, PipelineReport};

pub struct CoreApp {
    pub config: AppConfig,
    pub database: WarehouseService,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        let config = AppConfig::load(&cli_config)?;

        match command {
            Commands::Bootstrap { recreate_database } => {
                let app = Self::init(config, recreate_database).await?;
                let result = app.bootstrap().await;
                app.database.close().await;
                result
            }
            Commands::Load { .. } => {
                let app = Self::init(config, false).await?;
                let result = app.load().await;
                app.database.close().await;
                result
            }
        }
    }

    async fn init(config: AppConfig, recreate_database: bool) -> Result<Self> {
        let database = WarehouseService::init(&config.database, recreate_database)
            .await
            .with_context(|| {
                format!(
                    "Failed to connect to {} warehouse",
                    config.database.backend
                )
            })?;
        tracing::debug!(backend = %database.backend(), "Warehouse connected");
        Ok(Self { config, database })
    }

    /// Drop and recreate the five tables
    async fn bootstrap(&self) -> Result<()> {
        let repo = self.database.repository();
        repo.reset_schema()
            .await
            .context("Failed to reset warehouse schema")?;

        tracing::info!(backend = repo.backend_name(), "Schema reset");
        println!("Tables dropped and created ({})", repo.backend_name());
        Ok(())
    }

    /// Load song files then log files
    async fn load(&self) -> Result<()> {
        let repo = self.database.repository();
        let report = Pipeline::new(repo.as_ref(), &self.config.load)
            .run()
            .await
            .context("Load failed")?;

        Self::print_summary(&report);
        Ok(())
    }

    fn print_summary(report: &PipelineReport) {
        println!();
        for (stage, summary) in &report.stages {
            println!(
                "  {:<6} {} found, {} loaded, {} failed",
                stage.to_string(),
                summary.found,
                summary.loaded,
                summary.failed.len()
            );
            for path in &summary.failed {
                println!("           skipped {}", path.display());
            }
        }
        if report.failed_files() > 0 {
            println!("  {} file(s) skipped, see warnings above", report.failed_files());
        }
        let counts = &report.counts;
        println!();
        println!("  songplays {:>8}", counts.songplays);
        println!("  users     {:>8}", counts.users);
        println!("  songs     {:>8}", counts.songs);
        println!("  artists   {:>8}", counts.artists);
        println!("  time      {:>8}", counts.time);
        println!();
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", CRATE_LOG_TARGET);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }
}
