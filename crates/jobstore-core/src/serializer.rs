//! Job serializer.
//!
//! Blob layout: one format-version byte followed by a JSON document. Job
//! types stay forward compatible by giving new fields `#[serde(default)]`;
//! unknown fields are ignored on decode.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DecodeError;

/// Format version written by this build.
pub const FORMAT_VERSION: u8 = 1;

/// Converts jobs to and from opaque state blobs.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobSerializer;

impl JobSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Encode a job into a state blob.
    pub fn encode<J: Serialize>(&self, job: &J) -> Result<Vec<u8>, serde_json::Error> {
        let mut blob = vec![FORMAT_VERSION];
        serde_json::to_writer(&mut blob, job)?;
        Ok(blob)
    }

    /// Decode a state blob. Has no side effects beyond building the job.
    pub fn decode<J: DeserializeOwned>(&self, blob: &[u8]) -> Result<J, DecodeError> {
        let (version, payload) = blob.split_first().ok_or(DecodeError::Empty)?;
        if *version != FORMAT_VERSION {
            return Err(DecodeError::UnsupportedVersion(*version));
        }
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
#[path = "serializer_tests.rs"]
mod tests;
