//! Store subcommand handlers for jobstore.
//!
//! These work on raw job records and never decode job state, so running them
//! cannot quarantine records written by a scheduler with its own job type.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use jobstore_config::Config;
use jobstore_core::{
    open_connection, ExecutionLedger, ExecutionRecord, JobRecord, JobRecordStore,
    SqliteExecutionLedger, SqliteJobRecordStore,
};

use crate::cli::StoreCommand;

/// Record store and ledger sharing one connection.
struct Backend {
    records: Arc<SqliteJobRecordStore>,
    ledger: Arc<SqliteExecutionLedger>,
}

impl Backend {
    async fn open(config: &Config) -> Result<Self, Box<dyn std::error::Error>> {
        if config.store.backend == "memory" {
            warn!("Memory backend keeps no job records on disk; reading the SQLite database instead");
        }
        let conn = open_connection(&config.store).await?;
        Ok(Self {
            records: Arc::new(SqliteJobRecordStore::new(conn.clone())),
            ledger: Arc::new(SqliteExecutionLedger::new(
                conn,
                config.ledger.exception_max_len,
            )),
        })
    }

    async fn shutdown(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.records.shutdown().await?;
        Ok(())
    }
}

/// Handle store subcommands.
pub(crate) async fn handle_store_command(
    command: StoreCommand,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let backend = Backend::open(config).await?;

    let result = match command {
        StoreCommand::Jobs { format } => list_jobs(&backend, &format).await,
        StoreCommand::Due { at } => list_due(&backend, at.as_deref()).await,
        StoreCommand::Next => print_next(&backend).await,
        StoreCommand::Remove { job_id } => remove_job(&backend, &job_id).await,
        StoreCommand::Clear { yes } => clear_jobs(&backend, yes).await,
        StoreCommand::History { job, limit, format } => {
            show_history(&backend, job.as_deref(), limit, &format).await
        }
    };

    backend.shutdown().await?;
    result
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "paused".to_string())
}

/// List all job records with their ledger status.
async fn list_jobs(backend: &Backend, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let records = backend.records.all().await?;
    if records.is_empty() {
        println!("No jobs found.");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let status = backend.ledger.find(&record.id).await?.map(|e| e.status);
        rows.push((record, status));
    }

    match format {
        "json" => {
            let json: Vec<_> = rows
                .iter()
                .map(|(record, status)| job_json(record, status.map(|s| s.as_str())))
                .collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            println!("{:<30} {:<34} {:<10} {}", "ID", "NEXT RUN", "TRIGGER", "STATUS");
            println!("{}", "-".repeat(90));
            for (record, status) in rows {
                println!(
                    "{:<30} {:<34} {:<10} {}",
                    record.id,
                    format_time(record.next_run_time),
                    record.trigger_kind,
                    status.map(|s| s.as_str()).unwrap_or("-")
                );
            }
            println!("\n{} job(s)", records.len());
        }
    }
    Ok(())
}

fn job_json(record: &JobRecord, status: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "next_run_time": record.next_run_time,
        "trigger_kind": record.trigger_kind,
        "state_bytes": record.state.len(),
        "status": status,
    })
}

/// List IDs of due jobs.
async fn list_due(backend: &Backend, at: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let now = match at {
        Some(at) => DateTime::parse_from_rfc3339(at)?.with_timezone(&Utc),
        None => Utc::now(),
    };

    for record in backend.records.due(now).await? {
        println!("{}", record.id);
    }
    Ok(())
}

/// Print the next run time.
async fn print_next(backend: &Backend) -> Result<(), Box<dyn std::error::Error>> {
    match backend.records.next_run_time().await? {
        Some(time) => println!("{}", time.to_rfc3339()),
        None => println!("none"),
    }
    Ok(())
}

async fn remove_job(backend: &Backend, job_id: &str) -> Result<(), Box<dyn std::error::Error>> {
    backend.records.remove(job_id).await?;
    info!("Removed job '{}'", job_id);
    println!("Removed job '{}'", job_id);
    Ok(())
}

async fn clear_jobs(backend: &Backend, yes: bool) -> Result<(), Box<dyn std::error::Error>> {
    if !yes {
        return Err("refusing to remove all jobs without --yes".into());
    }

    let removed = backend.records.remove_all().await?;
    println!("Removed {} job(s)", removed);
    Ok(())
}

/// Show execution records.
async fn show_history(
    backend: &Backend,
    job: Option<&str>,
    limit: usize,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let records: Vec<ExecutionRecord> = match job {
        Some(job_id) => backend.ledger.find(job_id).await?.into_iter().collect(),
        None => backend.ledger.list(limit).await?,
    };

    if records.is_empty() {
        println!("No execution records found.");
        return Ok(());
    }

    match format {
        "json" => {
            let json: Vec<_> = records.iter().map(execution_json).collect();
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            println!(
                "{:<30} {:<18} {:<34} {}",
                "JOB", "STATUS", "RUN TIME", "EXCEPTION"
            );
            println!("{}", "-".repeat(100));
            for record in &records {
                println!(
                    "{:<30} {:<18} {:<34} {}",
                    record.job,
                    record.status.as_str(),
                    record.run_time.to_rfc3339(),
                    record.exception.as_deref().unwrap_or("-")
                );
            }
        }
    }
    Ok(())
}

fn execution_json(record: &ExecutionRecord) -> serde_json::Value {
    serde_json::json!({
        "id": record.id,
        "job": record.job,
        "status": record.status.as_str(),
        "run_time": record.run_time,
        "trigger_kind": record.trigger_kind,
        "finished": record.finished,
        "exception": record.exception,
        "traceback": record.traceback,
        "updated_at": record.updated_at,
    })
}
