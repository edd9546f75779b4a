//! Job store errors.

use thiserror::Error;

/// Failure to reconstruct a job from its stored blob.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The blob is empty.
    #[error("empty job state")]
    Empty,

    /// The blob was written with a format this build cannot read.
    #[error("unsupported job state format version {0}")]
    UnsupportedVersion(u8),

    /// The payload is not a valid job document.
    #[error("malformed job state: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Job store error types.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A job with this ID already exists.
    #[error("Job ID conflicts with an existing job: {0}")]
    ConflictingId(String),

    /// No job with this ID exists.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// Job ID is empty or too long.
    #[error("Invalid job ID: {0}")]
    InvalidJobId(String),

    /// A job could not be serialized.
    #[error("Failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),

    /// A stored job could not be restored.
    #[error("Unable to restore job '{job_id}': {source}")]
    Decode {
        job_id: String,
        #[source]
        source: DecodeError,
    },

    /// A lifecycle event references a job with no matching record.
    #[error("Event target missing for job '{0}'")]
    EventTargetMissing(String),

    /// A scheduler event code outside the supported vocabulary.
    #[error("Don't know how to handle scheduler event code {0}")]
    UnknownEventCode(u32),

    /// Backing store failure.
    #[error("Database error: {0}")]
    Database(String),

    /// Invalid store configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for job store operations.
pub type StoreResult<T> = Result<T, StoreError>;

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<tokio_rusqlite::Error> for StoreError {
    fn from(err: tokio_rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<jobstore_config::ConfigError> for StoreError {
    fn from(err: jobstore_config::ConfigError) -> Self {
        StoreError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = StoreError::Decode {
            job_id: "nightly-report".to_string(),
            source: DecodeError::UnsupportedVersion(9),
        };
        let display = err.to_string();
        assert!(display.contains("nightly-report"));
        assert!(display.contains("version 9"));
    }

    #[test]
    fn test_unknown_event_code_display() {
        let err = StoreError::UnknownEventCode(4);
        assert!(err.to_string().contains('4'));
    }

    #[test]
    fn test_rusqlite_error_maps_to_database() {
        let err = StoreError::from(rusqlite::Error::QueryReturnedNoRows);
        assert!(matches!(err, StoreError::Database(_)));
    }
}
