//! Job store service.
//!
//! [`JobStore`] is the facade a scheduler talks to: it validates job IDs,
//! serializes jobs, delegates to a [`JobRecordStore`] and exposes the
//! [`EventBridge`] that feeds the execution ledger.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use jobstore_config::{Config, ConfigValidator, LedgerConfig};

use crate::bridge::EventBridge;
use crate::error::{StoreError, StoreResult};
use crate::events::JobEvent;
use crate::job::StoredJob;
use crate::ledger::{ExecutionLedger, ExecutionRecord, SqliteExecutionLedger};
use crate::record::JobRecord;
use crate::serializer::JobSerializer;
use crate::sqlite::{open_connection, open_in_memory, SqliteJobRecordStore};
use crate::store::{JobRecordStore, MemoryJobRecordStore};

/// Maximum job ID length, in characters.
pub const MAX_JOB_ID_LEN: usize = 255;

/// Durable job store for jobs of type `J`.
pub struct JobStore<J> {
    records: Arc<dyn JobRecordStore>,
    ledger: Arc<dyn ExecutionLedger>,
    bridge: Arc<EventBridge>,
    serializer: JobSerializer,
    _job: PhantomData<fn() -> J>,
}

impl<J: StoredJob> JobStore<J> {
    /// Open the store described by `config`.
    ///
    /// The execution ledger always lives in the configured SQLite database;
    /// `store.backend` selects where job records are kept.
    pub async fn open(config: &Config) -> StoreResult<Self> {
        let warnings = ConfigValidator::validate(config).into_result()?;
        for warning in &warnings {
            warn!("Config warning at {}: {}", warning.path, warning.message);
        }

        let conn = open_connection(&config.store).await?;
        let ledger: Arc<dyn ExecutionLedger> = Arc::new(SqliteExecutionLedger::new(
            conn.clone(),
            config.ledger.exception_max_len,
        ));
        let records: Arc<dyn JobRecordStore> = match config.store.backend.as_str() {
            "memory" => Arc::new(MemoryJobRecordStore::with_ledger(ledger.clone())),
            "sqlite" => Arc::new(SqliteJobRecordStore::new(conn)),
            other => {
                return Err(StoreError::Config(format!("unknown store backend '{}'", other)));
            }
        };

        info!("Job store opened (backend: {})", records.backend());
        Ok(Self::with_components(records, ledger))
    }

    /// Store backed by a private in-memory SQLite database.
    pub async fn in_memory() -> StoreResult<Self> {
        let conn = open_in_memory().await?;
        let ledger = Arc::new(SqliteExecutionLedger::new(
            conn.clone(),
            LedgerConfig::default().exception_max_len,
        ));
        let records = Arc::new(SqliteJobRecordStore::new(conn));
        Ok(Self::with_components(records, ledger))
    }

    /// Compose a store from existing components.
    pub fn with_components(
        records: Arc<dyn JobRecordStore>,
        ledger: Arc<dyn ExecutionLedger>,
    ) -> Self {
        let bridge = Arc::new(EventBridge::new(records.clone(), ledger.clone()));
        Self {
            records,
            ledger,
            bridge,
            serializer: JobSerializer::new(),
            _job: PhantomData,
        }
    }

    /// Add a new job. Fails with `ConflictingId` if the ID is taken.
    pub async fn add_job(&self, job: &J) -> StoreResult<()> {
        let record = self.to_record(job)?;
        self.records.insert(record).await
    }

    /// Replace a stored job. Fails with `NotFound` if the ID is unknown.
    pub async fn update_job(&self, job: &J) -> StoreResult<()> {
        let record = self.to_record(job)?;
        self.records.replace(record).await
    }

    /// Remove a job and its execution record.
    pub async fn remove_job(&self, id: &str) -> StoreResult<()> {
        // An ID that could never be stored is simply absent.
        if validate_id(id).is_err() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        self.records.remove(id).await
    }

    /// Remove every job. Returns the number removed.
    pub async fn remove_all_jobs(&self) -> StoreResult<usize> {
        self.records.remove_all().await
    }

    /// Look up a job by ID.
    ///
    /// A record that cannot be restored is removed and reported as absent.
    pub async fn lookup_job(&self, id: &str) -> StoreResult<Option<J>> {
        if validate_id(id).is_err() {
            return Ok(None);
        }
        let Some(record) = self.records.lookup(id).await? else {
            return Ok(None);
        };
        Ok(self.restore(vec![record]).await?.pop())
    }

    /// Jobs due at `now`, earliest first.
    ///
    /// Records that cannot be restored are skipped and removed.
    pub async fn get_due_jobs(&self, now: DateTime<Utc>) -> StoreResult<Vec<J>> {
        let records = self.records.due(now).await?;
        self.restore(records).await
    }

    /// Earliest next run time of any scheduled job.
    pub async fn get_next_run_time(&self) -> StoreResult<Option<DateTime<Utc>>> {
        self.records.next_run_time().await
    }

    /// All jobs, earliest first, paused jobs last.
    ///
    /// Records that cannot be restored are skipped and removed.
    pub async fn get_all_jobs(&self) -> StoreResult<Vec<J>> {
        let records = self.records.all().await?;
        self.restore(records).await
    }

    /// Execution record of a job.
    pub async fn history(&self, job_id: &str) -> StoreResult<Option<ExecutionRecord>> {
        self.ledger.find(job_id).await
    }

    pub fn ledger(&self) -> &Arc<dyn ExecutionLedger> {
        &self.ledger
    }

    /// Sink that applies lifecycle events to the ledger.
    pub fn event_sink(&self) -> Arc<EventBridge> {
        self.bridge.clone()
    }

    /// Apply events received on `rx` until the channel closes.
    pub fn listen(&self, rx: mpsc::Receiver<JobEvent>) -> JoinHandle<()> {
        self.bridge.clone().listen(rx)
    }

    /// Close the backing store.
    pub async fn shutdown(&self) -> StoreResult<()> {
        self.records.shutdown().await?;
        self.ledger.shutdown().await?;
        info!("Job store shut down");
        Ok(())
    }

    fn to_record(&self, job: &J) -> StoreResult<JobRecord> {
        validate_id(job.id())?;
        let state = self.serializer.encode(job)?;
        Ok(JobRecord::new(
            job.id(),
            job.next_run_time(),
            job.trigger_kind(),
            state,
        ))
    }

    /// Decode records, quarantining the ones that fail.
    async fn restore(&self, records: Vec<JobRecord>) -> StoreResult<Vec<J>> {
        let mut jobs = Vec::with_capacity(records.len());
        let mut failed = Vec::new();

        for record in records {
            match self.serializer.decode::<J>(&record.state) {
                Ok(job) => jobs.push(job),
                Err(source) => {
                    let err = StoreError::Decode {
                        job_id: record.id.clone(),
                        source,
                    };
                    error!("{} -- removing it", err);
                    failed.push(record);
                }
            }
        }

        if !failed.is_empty() {
            let ids: Vec<&str> = failed.iter().map(|r| r.id.as_str()).collect();
            warn!("Removing {} unrestorable jobs: {:?}", ids.len(), ids);
            // Records replaced since the scan are kept.
            self.records.purge(&failed).await?;
        }
        Ok(jobs)
    }
}

fn validate_id(id: &str) -> StoreResult<()> {
    if id.is_empty() {
        return Err(StoreError::InvalidJobId("job ID must not be empty".to_string()));
    }
    if id.chars().count() > MAX_JOB_ID_LEN {
        return Err(StoreError::InvalidJobId(format!(
            "job ID exceeds {} characters",
            MAX_JOB_ID_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
