//! SQLite job record store.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;
use tracing::{debug, info};

use jobstore_config::StoreConfig;

use crate::columns::{invalid_text, opt_from_db, to_db};
use crate::error::{StoreError, StoreResult};
use crate::job::TriggerKind;
use crate::record::JobRecord;
use crate::schema::init_schema;
use crate::store::JobRecordStore;

/// Open the database described by `config` and initialize the schema.
///
/// File databases use WAL journaling; parent directories are created.
pub async fn open_connection(config: &StoreConfig) -> StoreResult<Connection> {
    if config.in_memory {
        return open_in_memory().await;
    }

    let path = config.database_path();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Database(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
    }

    let conn = Connection::open(&path).await?;
    let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
    conn.call(move |conn| {
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Ok(init_schema(conn)?)
    })
    .await?;

    info!("Opened job store database at {}", path.display());
    Ok(conn)
}

/// Open a private in-memory database with the schema initialized.
pub async fn open_in_memory() -> StoreResult<Connection> {
    let conn = Connection::open_in_memory().await?;
    conn.call(|conn| Ok(init_schema(conn)?)).await?;
    debug!("Opened in-memory job store database");
    Ok(conn)
}

const SELECT_JOB: &str = "SELECT id, next_run_time, trigger_kind, job_state FROM jobs";

/// SQLite-backed job record store.
///
/// Shares its connection with the execution ledger so that removals cascade
/// inside one transaction.
pub struct SqliteJobRecordStore {
    conn: Connection,
}

impl SqliteJobRecordStore {
    /// Create a store on an initialized connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    async fn query(&self, sql: String, bound: Option<i64>) -> StoreResult<Vec<JobRecord>> {
        let records = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = match &bound {
                    Some(value) => stmt.query_map([value], row_to_record)?,
                    None => stmt.query_map([], row_to_record)?,
                };
                Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
            })
            .await?;
        Ok(records)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<JobRecord> {
    let trigger_kind: String = row.get(2)?;
    Ok(JobRecord {
        id: row.get(0)?,
        next_run_time: opt_from_db(1, row.get(1)?)?,
        trigger_kind: TriggerKind::parse(&trigger_kind)
            .ok_or_else(|| invalid_text(2, "trigger kind", &trigger_kind))?,
        state: row.get(3)?,
    })
}

#[async_trait]
impl JobRecordStore for SqliteJobRecordStore {
    fn backend(&self) -> &str {
        "sqlite"
    }

    async fn lookup(&self, id: &str) -> StoreResult<Option<JobRecord>> {
        let id = id.to_string();
        let record = self
            .conn
            .call(move |conn| {
                Ok(conn
                    .query_row(&format!("{} WHERE id = ?1", SELECT_JOB), [&id], row_to_record)
                    .optional()?)
            })
            .await?;
        Ok(record)
    }

    async fn due(&self, now: DateTime<Utc>) -> StoreResult<Vec<JobRecord>> {
        self.query(
            format!(
                "{} WHERE next_run_time <= ?1 ORDER BY next_run_time ASC, rowid ASC",
                SELECT_JOB
            ),
            Some(to_db(&now)),
        )
        .await
    }

    async fn next_run_time(&self) -> StoreResult<Option<DateTime<Utc>>> {
        let value: Option<i64> = self
            .conn
            .call(|conn| {
                Ok(conn.query_row(
                    "SELECT MIN(next_run_time) FROM jobs WHERE next_run_time IS NOT NULL",
                    [],
                    |row| row.get(0),
                )?)
            })
            .await?;
        Ok(opt_from_db(0, value)?)
    }

    async fn all(&self) -> StoreResult<Vec<JobRecord>> {
        self.query(
            format!(
                "{} ORDER BY next_run_time IS NULL, next_run_time ASC, rowid ASC",
                SELECT_JOB
            ),
            None,
        )
        .await
    }

    async fn insert(&self, record: JobRecord) -> StoreResult<()> {
        let id = record.id.clone();
        let inserted = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "INSERT INTO jobs (id, next_run_time, trigger_kind, job_state)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO NOTHING",
                    params![
                        record.id,
                        record.next_run_time.as_ref().map(to_db),
                        record.trigger_kind.as_str(),
                        record.state
                    ],
                )?)
            })
            .await?;

        if inserted == 0 {
            return Err(StoreError::ConflictingId(id));
        }
        debug!("Inserted job record '{}'", id);
        Ok(())
    }

    async fn replace(&self, record: JobRecord) -> StoreResult<()> {
        let id = record.id.clone();
        let updated = self
            .conn
            .call(move |conn| {
                Ok(conn.execute(
                    "UPDATE jobs SET next_run_time = ?2, trigger_kind = ?3, job_state = ?4 WHERE id = ?1",
                    params![
                        record.id,
                        record.next_run_time.as_ref().map(to_db),
                        record.trigger_kind.as_str(),
                        record.state
                    ],
                )?)
            })
            .await?;

        if updated == 0 {
            return Err(StoreError::NotFound(id));
        }
        debug!("Replaced job record '{}'", id);
        Ok(())
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        let owned = id.to_string();
        let removed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM job_executions WHERE job = ?1", [&owned])?;
                let removed = tx.execute("DELETE FROM jobs WHERE id = ?1", [&owned])?;
                if removed == 0 {
                    // Dropping the transaction rolls back the ledger delete.
                    return Ok(false);
                }
                tx.commit()?;
                Ok(true)
            })
            .await?;

        if !removed {
            return Err(StoreError::NotFound(id.to_string()));
        }
        debug!("Removed job record '{}'", id);
        Ok(())
    }

    async fn remove_all(&self) -> StoreResult<usize> {
        let removed = self
            .conn
            .call(|conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM job_executions WHERE job IN (SELECT id FROM jobs)",
                    [],
                )?;
                let removed = tx.execute("DELETE FROM jobs", [])?;
                tx.commit()?;
                Ok(removed)
            })
            .await?;

        info!("Removed all {} job records", removed);
        Ok(removed)
    }

    async fn purge(&self, records: &[JobRecord]) -> StoreResult<usize> {
        let targets: Vec<(String, Vec<u8>)> = records
            .iter()
            .map(|r| (r.id.clone(), r.state.clone()))
            .collect();
        let removed = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut removed = 0;
                for (id, state) in &targets {
                    let deleted = tx.execute(
                        "DELETE FROM jobs WHERE id = ?1 AND job_state = ?2",
                        params![id, state],
                    )?;
                    if deleted > 0 {
                        tx.execute("DELETE FROM job_executions WHERE job = ?1", [id])?;
                        removed += deleted;
                    }
                }
                tx.commit()?;
                Ok(removed)
            })
            .await?;
        Ok(removed)
    }

    async fn shutdown(&self) -> StoreResult<()> {
        self.conn.clone().close().await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;
