//! Database schema management.

use rusqlite::Connection;

/// Current schema version, tracked in `PRAGMA user_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Initialize the database schema. Idempotent.
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA)?;

    let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    if version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    }
    Ok(())
}

const SCHEMA: &str = r#"
-- Job definitions
CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    next_run_time INTEGER,
    trigger_kind TEXT NOT NULL,
    job_state BLOB NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_jobs_next_run_time ON jobs(next_run_time);

-- Execution ledger. `job` is not a foreign key: records may
-- outlive or predate their job.
CREATE TABLE IF NOT EXISTS job_executions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job TEXT NOT NULL,
    status TEXT NOT NULL,
    run_time INTEGER NOT NULL,
    trigger_kind TEXT NOT NULL,
    finished INTEGER,
    exception TEXT,
    traceback TEXT,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_job_executions_job ON job_executions(job);
CREATE INDEX IF NOT EXISTS idx_job_executions_run_time ON job_executions(run_time);
"#;
