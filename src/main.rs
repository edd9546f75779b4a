//! jobstore - admin CLI for the scheduler job store.

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing::{error, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use jobstore_config::{jobstore_dir, Config, ConfigLoader, ConfigValidator, LoggingConfig};

mod cli;
mod cmd_check;
mod cmd_store;

use cli::{Cli, Commands};

/// Initialize tracing with console output, plus daily-rotated files when
/// `logging.directory` is set.
fn init_tracing(logging: &LoggingConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let file_layer = match logging.log_directory() {
        Some(log_dir) => {
            std::fs::create_dir_all(&log_dir)?;

            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("jobstore")
                .filename_suffix("log")
                .max_log_files(logging.max_log_files)
                .build(&log_dir)?;

            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keeps the writer thread alive for the program duration
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        // Console output goes to stderr so command output stays pipeable
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .with(file_layer)
        .init();

    Ok(())
}

fn default_config_path() -> PathBuf {
    jobstore_dir().join("config.toml")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let (config_path, mut config) = match cli.config {
        Some(path) => {
            let config = ConfigLoader::load(&path)?;
            (path, config)
        }
        None => {
            let path = default_config_path();
            let config = ConfigLoader::load_or_default(&path)?;
            (path, config)
        }
    };
    if let Some(database) = cli.database {
        config.store.path = database;
        config.store.in_memory = false;
    }

    init_tracing(&config.logging)?;

    let result = run(cli.command, &config_path, &config).await;
    if let Err(e) = &result {
        error!("{}", e);
    }
    result
}

async fn run(
    command: Commands,
    config_path: &Path,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Check => cmd_check::check_config(config_path, config),
        Commands::Store(command) => {
            let warnings = ConfigValidator::validate(config).into_result()?;
            for warning in warnings {
                warn!("Config warning at {}: {}", warning.path, warning.message);
            }
            cmd_store::handle_store_command(command, config).await
        }
    }
}
