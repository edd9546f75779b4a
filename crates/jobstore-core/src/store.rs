//! Job record persistence.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::ledger::ExecutionLedger;
use crate::record::JobRecord;

/// Job record store trait.
///
/// Removing a record also removes the job's execution records.
#[async_trait]
pub trait JobRecordStore: Send + Sync {
    /// Backend name.
    fn backend(&self) -> &str;

    /// Load a record by ID. Absence is not an error.
    async fn lookup(&self, id: &str) -> StoreResult<Option<JobRecord>>;

    /// Records with `next_run_time <= now`, earliest first, ties in insertion order.
    async fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<JobRecord>>;

    /// Earliest scheduled run time across all records.
    async fn next_run_time(&self) -> StoreResult<Option<DateTime<Utc>>>;

    /// All records, earliest first, paused records last.
    async fn all(&self) -> StoreResult<Vec<JobRecord>>;

    /// Insert a new record. Fails with `ConflictingId` if the ID exists.
    async fn insert(&self, record: JobRecord) -> StoreResult<()>;

    /// Replace an existing record. Fails with `NotFound` if the ID is absent.
    async fn replace(&self, record: JobRecord) -> StoreResult<()>;

    /// Remove a record. Fails with `NotFound` if the ID is absent.
    async fn remove(&self, id: &str) -> StoreResult<()>;

    /// Remove every record. Returns the number removed.
    async fn remove_all(&self) -> StoreResult<usize>;

    /// Remove the given records if they still hold the same state.
    ///
    /// Records that are gone, or were replaced since they were read, are
    /// skipped. Returns the number removed.
    async fn purge(&self, records: &[JobRecord]) -> StoreResult<usize>;

    /// Release backend resources.
    async fn shutdown(&self) -> StoreResult<()>;
}

struct Slot {
    seq: u64,
    record: JobRecord,
}

#[derive(Default)]
struct MemoryState {
    records: HashMap<String, Slot>,
    /// `(next_run_time, insertion seq, id)` for scheduled records.
    schedule: BTreeSet<(DateTime<Utc>, u64, String)>,
    next_seq: u64,
}

impl MemoryState {
    fn unschedule(&mut self, id: &str) {
        if let Some(slot) = self.records.get(id) {
            if let Some(time) = slot.record.next_run_time {
                self.schedule.remove(&(time, slot.seq, id.to_string()));
            }
        }
    }

    fn take(&mut self, id: &str) -> Option<JobRecord> {
        self.unschedule(id);
        self.records.remove(id).map(|slot| slot.record)
    }
}

/// In-memory job record store.
///
/// Job records live in process; execution records are cascaded to the
/// attached ledger, if any.
pub struct MemoryJobRecordStore {
    state: RwLock<MemoryState>,
    ledger: Option<Arc<dyn ExecutionLedger>>,
}

impl MemoryJobRecordStore {
    /// Create a new memory store.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            ledger: None,
        }
    }

    /// Create a memory store that cascades removals to `ledger`.
    pub fn with_ledger(ledger: Arc<dyn ExecutionLedger>) -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            ledger: Some(ledger),
        }
    }

    async fn cascade(&self, ids: &[String]) -> StoreResult<()> {
        if let Some(ledger) = &self.ledger {
            if !ids.is_empty() {
                ledger.purge(ids).await?;
            }
        }
        Ok(())
    }
}

impl Default for MemoryJobRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobRecordStore for MemoryJobRecordStore {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn lookup(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        let state = self.state.read().await;
        Ok(state.records.get(id).map(|slot| slot.record.clone()))
    }

    async fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<JobRecord>> {
        let state = self.state.read().await;
        Ok(state
            .schedule
            .iter()
            .take_while(|(time, _, _)| *time <= now)
            .filter_map(|(_, _, id)| state.records.get(id))
            .map(|slot| slot.record.clone())
            .collect())
    }

    async fn next_run_time(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let state = self.state.read().await;
        Ok(state.schedule.first().map(|(time, _, _)| *time))
    }

    async fn all(&self) -> StoreResult<Vec<JobRecord>> {
        let state = self.state.read().await;

        let mut paused: Vec<&Slot> = state
            .records
            .values()
            .filter(|slot| slot.record.is_paused())
            .collect();
        paused.sort_by_key(|slot| slot.seq);

        let scheduled = state
            .schedule
            .iter()
            .filter_map(|(_, _, id)| state.records.get(id));

        Ok(scheduled
            .chain(paused)
            .map(|slot| slot.record.clone())
            .collect())
    }

    async fn insert(&self, record: JobRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state.records.contains_key(&record.id) {
            return Err(StoreError::ConflictingId(record.id));
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        if let Some(time) = record.next_run_time {
            state.schedule.insert((time, seq, record.id.clone()));
        }
        debug!("Inserted job record '{}'", record.id);
        state.records.insert(record.id.clone(), Slot { seq, record });
        Ok(())
    }

    async fn replace(&self, record: JobRecord) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let Some(seq) = state.records.get(&record.id).map(|slot| slot.seq) else {
            return Err(StoreError::NotFound(record.id));
        };

        state.unschedule(&record.id);
        if let Some(time) = record.next_run_time {
            state.schedule.insert((time, seq, record.id.clone()));
        }
        debug!("Replaced job record '{}'", record.id);
        state.records.insert(record.id.clone(), Slot { seq, record });
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        let removed = self.state.write().await.take(id);
        if removed.is_none() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!("Removed job record '{}'", id);
        self.cascade(&[id.to_string()]).await
    }

    async fn remove_all(&self) -> StoreResult<usize> {
        let ids: Vec<String> = {
            let mut state = self.state.write().await;
            state.schedule.clear();
            state.records.drain().map(|(id, _)| id).collect()
        };
        self.cascade(&ids).await?;
        Ok(ids.len())
    }

    async fn purge(&self, records: &[JobRecord]) -> StoreResult<usize> {
        let removed: Vec<String> = {
            let mut state = self.state.write().await;
            let mut removed = Vec::new();
            for record in records {
                let unchanged = state
                    .records
                    .get(&record.id)
                    .is_some_and(|slot| slot.record.state == record.state);
                if unchanged {
                    state.take(&record.id);
                    removed.push(record.id.clone());
                }
            }
            removed
        };
        self.cascade(&removed).await?;
        Ok(removed.len())
    }

    async fn shutdown(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
