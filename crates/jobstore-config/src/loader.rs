//! Configuration loader.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::Config;

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a file, falling back to defaults when it is absent.
    pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Config::default()),
            other => other,
        }
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let mut result = content.to_string();
        let re = regex::Regex::new(r"\$\{([^}]+)\}")
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_empty_config() {
        let config = ConfigLoader::load_str("").unwrap();
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn test_load_store_config() {
        let content = r#"
            [store]
            backend = "memory"
            path = "/var/lib/jobstore/jobs.db"
            busy_timeout_ms = 250
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.store.backend, "memory");
        assert_eq!(config.store.path.to_str().unwrap(), "/var/lib/jobstore/jobs.db");
        assert_eq!(config.store.busy_timeout_ms, 250);
    }

    #[test]
    fn test_load_full_config() {
        let content = r#"
            [store]
            in_memory = true

            [ledger]
            exception_max_len = 512

            [logging]
            level = "debug"
            directory = "/tmp/jobstore-logs"
        "#;
        let config = ConfigLoader::load_str(content).unwrap();
        assert!(config.store.in_memory);
        assert_eq!(config.ledger.exception_max_len, 512);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.directory.is_some());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[store]").unwrap();
        writeln!(file, "busy_timeout_ms = 1500").unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.store.busy_timeout_ms, 1500);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ConfigLoader::load(Path::new("/nonexistent/path/jobstore.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_load_or_default_nonexistent_file() {
        let config = ConfigLoader::load_or_default(Path::new("/nonexistent/jobstore.toml")).unwrap();
        assert_eq!(config.store.backend, "sqlite");
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_str("invalid = [unclosed");
        assert!(matches!(result, Err(ConfigError::TomlParse(_))));
    }

    #[test]
    fn test_expand_env_vars() {
        // SAFETY: This test runs in isolation and sets a unique test-only env var
        unsafe {
            std::env::set_var("JOBSTORE_TEST_DB_PATH", "/srv/jobs.db");
        }
        let content = "[store]\npath = \"${JOBSTORE_TEST_DB_PATH}\"";
        let config = ConfigLoader::load_str(content).unwrap();
        assert_eq!(config.store.path.to_str().unwrap(), "/srv/jobs.db");
        unsafe {
            std::env::remove_var("JOBSTORE_TEST_DB_PATH");
        }
    }

    #[test]
    fn test_expand_env_vars_not_set() {
        let content = "value = \"${NONEXISTENT_TEST_VAR_12345}\"";
        let result = ConfigLoader::expand_env_vars(content);
        assert!(matches!(result, Err(ConfigError::EnvVarNotSet(_))));
    }

    #[test]
    fn test_expand_env_vars_no_vars() {
        let content = "value = \"no variables here\"";
        let expanded = ConfigLoader::expand_env_vars(content).unwrap();
        assert_eq!(expanded, content);
    }
}
