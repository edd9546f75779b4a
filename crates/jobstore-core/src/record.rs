//! Persisted job record.

use chrono::{DateTime, SubsecRound, Utc};

use crate::job::TriggerKind;

/// A job definition as stored by a [`JobRecordStore`](crate::store::JobRecordStore).
///
/// `state` is opaque to the store; only the serializer understands it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    /// Unique job ID.
    pub id: String,
    /// Next scheduled run. `None` = paused.
    pub next_run_time: Option<DateTime<Utc>>,
    /// Trigger classification.
    pub trigger_kind: TriggerKind,
    /// Serialized job.
    pub state: Vec<u8>,
}

impl JobRecord {
    /// Create a record.
    ///
    /// `next_run_time` is truncated to microseconds, the precision the SQLite
    /// backend keeps, so every backend orders and compares the same values.
    pub fn new(
        id: impl Into<String>,
        next_run_time: Option<DateTime<Utc>>,
        trigger_kind: TriggerKind,
        state: Vec<u8>,
    ) -> Self {
        Self {
            id: id.into(),
            next_run_time: next_run_time.map(|t| t.trunc_subsecs(6)),
            trigger_kind,
            state,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.next_run_time.is_none()
    }

    /// Whether the record is due at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run_time.is_some_and(|t| t <= now)
    }
}
