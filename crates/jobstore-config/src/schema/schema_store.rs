//! Store and ledger configuration types.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::{expand_tilde, jobstore_dir};

/// Backends accepted in `store.backend`.
pub const STORE_BACKENDS: [&str; 2] = ["sqlite", "memory"];

/// Job record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Record backend ("sqlite" or "memory").
    ///
    /// The execution ledger always lives in SQLite; with the "memory" backend
    /// only job records are kept in process.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Use an in-memory SQLite database instead of `path`.
    #[serde(default)]
    pub in_memory: bool,

    /// SQLite busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

impl StoreConfig {
    /// Database path with `~` expanded.
    pub fn database_path(&self) -> PathBuf {
        expand_tilde(&self.path)
    }
}

fn default_backend() -> String {
    "sqlite".to_string()
}

fn default_db_path() -> PathBuf {
    jobstore_dir().join("jobs.db")
}

fn default_busy_timeout() -> u64 {
    5000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            path: default_db_path(),
            in_memory: false,
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

/// Execution ledger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Maximum stored length of an exception summary, in characters.
    #[serde(default = "default_exception_max_len")]
    pub exception_max_len: usize,
}

fn default_exception_max_len() -> usize {
    1000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            exception_max_len: default_exception_max_len(),
        }
    }
}
