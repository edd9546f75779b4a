//! CLI definitions for jobstore.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// jobstore admin CLI.
#[derive(Parser)]
#[command(name = "jobstore")]
#[command(about = "Inspect and maintain a scheduler job store")]
#[command(version)]
pub(crate) struct Cli {
    /// Configuration file path (default: ~/.jobstore/config.toml)
    #[arg(short, long, global = true, env = "JOBSTORE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overriding `store.path`
    #[arg(short, long, global = true)]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    #[command(flatten)]
    Store(StoreCommand),

    /// Validate the configuration file
    Check,
}

#[derive(Subcommand)]
pub(crate) enum StoreCommand {
    /// List job records
    Jobs {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// List IDs of jobs that are due
    Due {
        /// Reference time in RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Print the next scheduled run time
    Next,

    /// Remove a job and its execution record
    Remove {
        /// Job ID
        job_id: String,
    },

    /// Remove all jobs
    Clear {
        /// Confirm removal
        #[arg(long)]
        yes: bool,
    },

    /// Show execution records
    History {
        /// Only show this job
        #[arg(long)]
        job: Option<String>,

        /// Maximum number of records
        #[arg(long, default_value_t = 20)]
        limit: usize,

        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}
