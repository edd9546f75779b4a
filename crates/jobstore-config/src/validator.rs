//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, STORE_BACKENDS};

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Convert the first error into a `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_store(config, &mut result);
        Self::validate_ledger(config, &mut result);
        Self::validate_logging(config, &mut result);

        result
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        let store = &config.store;

        if !STORE_BACKENDS.contains(&store.backend.as_str()) {
            result.add_error(ValidationError::new(
                "store.backend",
                format!(
                    "Unknown store backend '{}', valid values: {:?}",
                    store.backend, STORE_BACKENDS
                ),
            ));
        }

        if store.backend == "memory" {
            result.add_warning(ValidationWarning::new(
                "store.backend",
                "Memory backend keeps job records in process; they are lost on restart",
            ));
        }

        if store.in_memory {
            result.add_warning(ValidationWarning::new(
                "store.in_memory",
                "In-memory SQLite database; jobs and execution history are not durable",
            ));
        } else if store.path.as_os_str().is_empty() {
            result.add_error(ValidationError::new(
                "store.path",
                "Database path cannot be empty",
            ));
        }

        if store.busy_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "store.busy_timeout_ms",
                "busy_timeout_ms must be greater than 0",
            ));
        }
    }

    fn validate_ledger(config: &Config, result: &mut ValidationResult) {
        if config.ledger.exception_max_len == 0 {
            result.add_error(ValidationError::new(
                "ledger.exception_max_len",
                "exception_max_len must be greater than 0",
            ));
        }
    }

    fn validate_logging(config: &Config, result: &mut ValidationResult) {
        if config.logging.level.trim().is_empty() {
            result.add_error(ValidationError::new(
                "logging.level",
                "Log level cannot be empty",
            ));
        }

        if config.logging.directory.is_some() && config.logging.max_log_files == 0 {
            result.add_warning(ValidationWarning::new(
                "logging.max_log_files",
                "max_log_files is 0, rotated log files will never be pruned",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
