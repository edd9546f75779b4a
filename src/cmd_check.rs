//! Configuration check for jobstore.

use std::path::Path;

use jobstore_config::{Config, ConfigValidator};

/// Validate the configuration and print the findings.
pub(crate) fn check_config(path: &Path, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let result = ConfigValidator::validate(config);

    println!("Configuration: {}", path.display());
    println!("Backend:       {}", config.store.backend);
    if config.store.in_memory {
        println!("Database:      in-memory");
    } else {
        println!("Database:      {}", config.store.database_path().display());
    }

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }

    if !result.is_valid() {
        return Err(format!("{} configuration error(s)", result.errors.len()).into());
    }
    println!("\nConfiguration is valid");
    Ok(())
}
