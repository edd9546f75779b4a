//! Execution ledger.
//!
//! Keeps at most one open execution record per job: a new ADDED event resets
//! the existing record in place instead of appending a row.

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use tokio_rusqlite::Connection;
use tracing::debug;

use crate::columns::{from_db, invalid_text, opt_from_db, to_db};
use crate::error::{StoreError, StoreResult};
use crate::job::TriggerKind;

/// Execution status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Job was added to the scheduler.
    Added,
    /// Job was submitted for execution.
    Started,
    /// Last run completed successfully.
    Succeeded,
    /// Last run time was missed.
    Missed,
    /// Run skipped because the job hit its instance limit.
    MaxInstances,
    /// Last run raised an error.
    Error,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Added => "Job Added",
            ExecutionStatus::Started => "Started execution",
            ExecutionStatus::Succeeded => "Executed",
            ExecutionStatus::Missed => "Missed!",
            ExecutionStatus::MaxInstances => "Max instances!",
            ExecutionStatus::Error => "Error!",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Job Added" => Some(ExecutionStatus::Added),
            "Started execution" => Some(ExecutionStatus::Started),
            "Executed" => Some(ExecutionStatus::Succeeded),
            "Missed!" => Some(ExecutionStatus::Missed),
            "Max instances!" => Some(ExecutionStatus::MaxInstances),
            "Error!" => Some(ExecutionStatus::Error),
            _ => None,
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution record of a job.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionRecord {
    pub id: i64,
    pub job: String,
    pub status: ExecutionStatus,
    pub run_time: DateTime<Utc>,
    pub trigger_kind: TriggerKind,
    pub finished: Option<DateTime<Utc>>,
    pub exception: Option<String>,
    pub traceback: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Change applied to a job's open execution record.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionUpdate {
    /// Run submitted to an executor.
    Started,
    /// Run finished successfully.
    Succeeded { finished: DateTime<Utc> },
    /// Run failed, was missed or was skipped.
    Failed {
        status: ExecutionStatus,
        exception: String,
        traceback: Option<String>,
    },
    /// Job was rescheduled.
    Rescheduled { run_time: DateTime<Utc> },
}

/// Execution ledger trait.
#[async_trait]
pub trait ExecutionLedger: Send + Sync {
    /// Create the job's execution record, or reset the existing one.
    async fn open(
        &self,
        job_id: &str,
        trigger_kind: TriggerKind,
        run_time: DateTime<Utc>,
    ) -> StoreResult<ExecutionRecord>;

    /// Most recent execution record of a job.
    async fn find(&self, job_id: &str) -> StoreResult<Option<ExecutionRecord>>;

    /// Apply an update to the job's record. `None` if the job has no record.
    async fn update(
        &self,
        job_id: &str,
        update: ExecutionUpdate,
    ) -> StoreResult<Option<ExecutionRecord>>;

    /// Delete the execution records of the given jobs.
    async fn purge(&self, job_ids: &[String]) -> StoreResult<usize>;

    /// Most recently updated records first.
    async fn list(&self, limit: usize) -> StoreResult<Vec<ExecutionRecord>>;

    /// Number of execution records.
    async fn count(&self) -> StoreResult<usize>;

    /// Release backend resources.
    async fn shutdown(&self) -> StoreResult<()>;
}

const SELECT_EXECUTION: &str = "SELECT id, job, status, run_time, trigger_kind, finished, exception, traceback, created_at, updated_at FROM job_executions";

/// SQLite-backed execution ledger.
pub struct SqliteExecutionLedger {
    conn: Connection,
    exception_max_len: usize,
}

impl SqliteExecutionLedger {
    /// Create a ledger on an initialized connection.
    pub fn new(conn: Connection, exception_max_len: usize) -> Self {
        Self {
            conn,
            exception_max_len,
        }
    }

    fn truncate(&self, text: String) -> String {
        match text.char_indices().nth(self.exception_max_len) {
            Some((end, _)) => text[..end].to_string(),
            None => text,
        }
    }
}

fn row_to_execution(row: &rusqlite::Row) -> rusqlite::Result<ExecutionRecord> {
    let status: String = row.get(2)?;
    let trigger_kind: String = row.get(4)?;

    Ok(ExecutionRecord {
        id: row.get(0)?,
        job: row.get(1)?,
        status: ExecutionStatus::parse(&status)
            .ok_or_else(|| invalid_text(2, "execution status", &status))?,
        run_time: from_db(3, row.get(3)?)?,
        trigger_kind: TriggerKind::parse(&trigger_kind)
            .ok_or_else(|| invalid_text(4, "trigger kind", &trigger_kind))?,
        finished: opt_from_db(5, row.get(5)?)?,
        exception: row.get(6)?,
        traceback: row.get(7)?,
        created_at: from_db(8, row.get(8)?)?,
        updated_at: from_db(9, row.get(9)?)?,
    })
}

fn latest_execution_id(tx: &Transaction, job_id: &str) -> rusqlite::Result<Option<i64>> {
    tx.query_row(
        "SELECT id FROM job_executions WHERE job = ?1 ORDER BY id DESC LIMIT 1",
        [job_id],
        |row| row.get(0),
    )
    .optional()
}

fn load_execution(tx: &Transaction, id: i64) -> rusqlite::Result<ExecutionRecord> {
    tx.query_row(
        &format!("{} WHERE id = ?1", SELECT_EXECUTION),
        [id],
        row_to_execution,
    )
}

#[async_trait]
impl ExecutionLedger for SqliteExecutionLedger {
    async fn open(
        &self,
        job_id: &str,
        trigger_kind: TriggerKind,
        run_time: DateTime<Utc>,
    ) -> StoreResult<ExecutionRecord> {
        let job_id = job_id.to_string();
        let run_time = to_db(&run_time);
        let now = to_db(&Utc::now());

        let record = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                let id = match latest_execution_id(&tx, &job_id)? {
                    Some(id) => {
                        tx.execute(
                            "UPDATE job_executions SET status = ?1, run_time = ?2, trigger_kind = ?3,
                             finished = NULL, exception = NULL, traceback = NULL, updated_at = ?4
                             WHERE id = ?5",
                            params![ExecutionStatus::Added.as_str(), run_time, trigger_kind.as_str(), now, id],
                        )?;
                        id
                    }
                    None => {
                        tx.execute(
                            "INSERT INTO job_executions (job, status, run_time, trigger_kind, created_at, updated_at)
                             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                            params![job_id, ExecutionStatus::Added.as_str(), run_time, trigger_kind.as_str(), now],
                        )?;
                        tx.last_insert_rowid()
                    }
                };

                let record = load_execution(&tx, id)?;
                tx.commit()?;
                Ok(record)
            })
            .await?;

        debug!("Opened execution record {} for job '{}'", record.id, record.job);
        Ok(record)
    }

    async fn find(&self, job_id: &str) -> StoreResult<Option<ExecutionRecord>> {
        let job_id = job_id.to_string();
        let record = self
            .conn
            .call(move |conn| {
                let record = conn
                    .query_row(
                        &format!("{} WHERE job = ?1 ORDER BY id DESC LIMIT 1", SELECT_EXECUTION),
                        [&job_id],
                        row_to_execution,
                    )
                    .optional()?;
                Ok(record)
            })
            .await?;
        Ok(record)
    }

    async fn update(
        &self,
        job_id: &str,
        update: ExecutionUpdate,
    ) -> StoreResult<Option<ExecutionRecord>> {
        let job_id = job_id.to_string();
        let now = to_db(&Utc::now());
        let update = match update {
            ExecutionUpdate::Failed {
                status,
                exception,
                traceback,
            } => ExecutionUpdate::Failed {
                status,
                exception: self.truncate(exception),
                traceback,
            },
            other => other,
        };

        let record = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let Some(id) = latest_execution_id(&tx, &job_id)? else {
                    return Ok(None);
                };

                match update {
                    ExecutionUpdate::Started => {
                        tx.execute(
                            "UPDATE job_executions SET status = ?1, updated_at = ?2 WHERE id = ?3",
                            params![ExecutionStatus::Started.as_str(), now, id],
                        )?;
                    }
                    ExecutionUpdate::Succeeded { finished } => {
                        tx.execute(
                            "UPDATE job_executions SET status = ?1, finished = ?2, updated_at = ?3 WHERE id = ?4",
                            params![ExecutionStatus::Succeeded.as_str(), to_db(&finished), now, id],
                        )?;
                    }
                    ExecutionUpdate::Failed {
                        status,
                        exception,
                        traceback,
                    } => {
                        tx.execute(
                            "UPDATE job_executions SET status = ?1, exception = ?2, traceback = ?3, updated_at = ?4
                             WHERE id = ?5",
                            params![status.as_str(), exception, traceback, now, id],
                        )?;
                    }
                    ExecutionUpdate::Rescheduled { run_time } => {
                        tx.execute(
                            "UPDATE job_executions SET run_time = ?1, updated_at = ?2 WHERE id = ?3",
                            params![to_db(&run_time), now, id],
                        )?;
                    }
                }

                let record = load_execution(&tx, id)?;
                tx.commit()?;
                Ok(Some(record))
            })
            .await?;
        Ok(record)
    }

    async fn purge(&self, job_ids: &[String]) -> StoreResult<usize> {
        let job_ids = job_ids.to_vec();
        let removed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut removed = 0;
                for job_id in &job_ids {
                    removed += tx.execute("DELETE FROM job_executions WHERE job = ?1", [job_id])?;
                }
                tx.commit()?;
                Ok(removed)
            })
            .await?;

        if removed > 0 {
            debug!("Purged {} execution records", removed);
        }
        Ok(removed)
    }

    async fn list(&self, limit: usize) -> StoreResult<Vec<ExecutionRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} ORDER BY updated_at DESC, id DESC LIMIT ?1",
                    SELECT_EXECUTION
                ))?;
                let records = stmt
                    .query_map([limit], row_to_execution)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(records)
            })
            .await?;
        Ok(records)
    }

    async fn count(&self) -> StoreResult<usize> {
        let count: i64 = self
            .conn
            .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM job_executions", [], |row| row.get(0))?))
            .await?;
        usize::try_from(count).map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.conn.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;
