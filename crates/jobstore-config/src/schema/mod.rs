//! Configuration schema definitions.

use serde::{Deserialize, Serialize};

mod schema_logging;
mod schema_store;

pub use schema_logging::*;
pub use schema_store::*;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Base directory for jobstore state (`~/.jobstore`).
pub fn jobstore_dir() -> std::path::PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".jobstore"))
        .unwrap_or_else(|| std::path::PathBuf::from(".jobstore"))
}

/// Expand a leading `~` in a configured path.
pub(crate) fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    match path.to_str() {
        Some(s) => std::path::PathBuf::from(shellexpand::tilde(s).as_ref()),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
