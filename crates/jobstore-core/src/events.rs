//! Scheduler lifecycle events.

use std::fmt;

use crate::error::{StoreError, StoreResult};

/// A job was added to the scheduler.
pub const JOB_ADDED: u32 = 1 << 9;
/// A job's definition or schedule changed.
pub const JOB_MODIFIED: u32 = 1 << 11;
/// A job run completed successfully.
pub const JOB_EXECUTED: u32 = 1 << 12;
/// A job run raised an error.
pub const JOB_ERROR: u32 = 1 << 13;
/// A job run was missed.
pub const JOB_MISSED: u32 = 1 << 14;
/// A job run was submitted to an executor.
pub const JOB_SUBMITTED: u32 = 1 << 15;
/// A job run was skipped because too many instances were running.
pub const JOB_MAX_INSTANCES: u32 = 1 << 16;

/// Kind of lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobEventKind {
    Added,
    Modified,
    Submitted,
    Executed,
    Error,
    Missed,
    MaxInstances,
}

impl JobEventKind {
    /// Map a raw scheduler event code. Codes are single bits; masks combining
    /// several events are rejected.
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            JOB_ADDED => Some(JobEventKind::Added),
            JOB_MODIFIED => Some(JobEventKind::Modified),
            JOB_SUBMITTED => Some(JobEventKind::Submitted),
            JOB_EXECUTED => Some(JobEventKind::Executed),
            JOB_ERROR => Some(JobEventKind::Error),
            JOB_MISSED => Some(JobEventKind::Missed),
            JOB_MAX_INSTANCES => Some(JobEventKind::MaxInstances),
            _ => None,
        }
    }

    pub fn code(&self) -> u32 {
        match self {
            JobEventKind::Added => JOB_ADDED,
            JobEventKind::Modified => JOB_MODIFIED,
            JobEventKind::Submitted => JOB_SUBMITTED,
            JobEventKind::Executed => JOB_EXECUTED,
            JobEventKind::Error => JOB_ERROR,
            JobEventKind::Missed => JOB_MISSED,
            JobEventKind::MaxInstances => JOB_MAX_INSTANCES,
        }
    }
}

impl fmt::Display for JobEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobEventKind::Added => "added",
            JobEventKind::Modified => "modified",
            JobEventKind::Submitted => "submitted",
            JobEventKind::Executed => "executed",
            JobEventKind::Error => "error",
            JobEventKind::Missed => "missed",
            JobEventKind::MaxInstances => "max_instances",
        };
        f.write_str(name)
    }
}

/// A lifecycle event for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobEvent {
    pub job_id: String,
    pub kind: JobEventKind,
    /// Error message, for `Error` events.
    pub exception: Option<String>,
    /// Error detail, for `Error` events.
    pub traceback: Option<String>,
}

impl JobEvent {
    pub fn new(job_id: impl Into<String>, kind: JobEventKind) -> Self {
        Self {
            job_id: job_id.into(),
            kind,
            exception: None,
            traceback: None,
        }
    }

    /// Build an event from a raw scheduler code.
    pub fn from_code(job_id: impl Into<String>, code: u32) -> StoreResult<Self> {
        let kind = JobEventKind::from_code(code).ok_or(StoreError::UnknownEventCode(code))?;
        Ok(Self::new(job_id, kind))
    }

    pub fn added(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobEventKind::Added)
    }

    pub fn modified(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobEventKind::Modified)
    }

    pub fn submitted(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobEventKind::Submitted)
    }

    pub fn executed(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobEventKind::Executed)
    }

    pub fn missed(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobEventKind::Missed)
    }

    pub fn max_instances(job_id: impl Into<String>) -> Self {
        Self::new(job_id, JobEventKind::MaxInstances)
    }

    /// Error event carrying the error message and optional detail.
    pub fn error(
        job_id: impl Into<String>,
        exception: Option<String>,
        traceback: Option<String>,
    ) -> Self {
        Self {
            exception,
            traceback,
            ..Self::new(job_id, JobEventKind::Error)
        }
    }
}
