//! Logging configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::expand_tilde;

/// Logging configuration for the jobstore binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Number of rotated log files to keep.
    #[serde(default = "default_max_log_files")]
    pub max_log_files: usize,
}

impl LoggingConfig {
    /// Log directory with `~` expanded.
    pub fn log_directory(&self) -> Option<PathBuf> {
        self.directory.as_deref().map(expand_tilde)
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    30
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: None,
            max_log_files: default_max_log_files(),
        }
    }
}
