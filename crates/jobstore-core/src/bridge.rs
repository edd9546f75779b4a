//! Event bridge: turns scheduler lifecycle events into execution records.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::error::{StoreError, StoreResult};
use crate::events::{JobEvent, JobEventKind};
use crate::ledger::{ExecutionLedger, ExecutionRecord, ExecutionStatus, ExecutionUpdate};
use crate::store::JobRecordStore;

/// Receiver of scheduler lifecycle events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Deliver one event. Failures are logged, not returned.
    async fn publish(&self, event: JobEvent);
}

/// Applies lifecycle events to an execution ledger.
pub struct EventBridge {
    records: Arc<dyn JobRecordStore>,
    ledger: Arc<dyn ExecutionLedger>,
}

impl EventBridge {
    pub fn new(records: Arc<dyn JobRecordStore>, ledger: Arc<dyn ExecutionLedger>) -> Self {
        Self { records, ledger }
    }

    /// Apply one event to the ledger.
    ///
    /// Returns the updated execution record, or `None` when the job record
    /// (or, after Added, its execution record) does not exist. Missing targets
    /// are logged and skipped; store failures are returned.
    pub async fn apply(&self, event: &JobEvent) -> StoreResult<Option<ExecutionRecord>> {
        match self.transition(event).await {
            Err(StoreError::EventTargetMissing(job_id)) => {
                warn!(
                    "Skipping {} event: no execution target for job '{}'",
                    event.kind, job_id
                );
                Ok(None)
            }
            result => result.map(Some),
        }
    }

    async fn transition(&self, event: &JobEvent) -> StoreResult<ExecutionRecord> {
        let job_id = event.job_id.as_str();
        debug!("Applying {} event for job '{}'", event.kind, job_id);

        // Every event needs a live job; ledger rows left behind by removed
        // jobs are never updated.
        let record = self
            .records
            .lookup(job_id)
            .await?
            .ok_or_else(|| missing(job_id))?;

        let update = match event.kind {
            JobEventKind::Added => {
                return self.ledger.open(job_id, record.trigger_kind, Utc::now()).await;
            }
            JobEventKind::Modified => match record.next_run_time {
                Some(run_time) => ExecutionUpdate::Rescheduled { run_time },
                // Paused: keep the last run time.
                None => {
                    return self
                        .ledger
                        .find(job_id)
                        .await?
                        .ok_or_else(|| missing(job_id));
                }
            },
            JobEventKind::Submitted => ExecutionUpdate::Started,
            JobEventKind::Executed => ExecutionUpdate::Succeeded {
                finished: Utc::now(),
            },
            JobEventKind::Error => ExecutionUpdate::Failed {
                status: ExecutionStatus::Error,
                exception: event
                    .exception
                    .clone()
                    .unwrap_or_else(|| format!("Job '{}' raised an error!", job_id)),
                traceback: event.traceback.clone(),
            },
            JobEventKind::Missed => ExecutionUpdate::Failed {
                status: ExecutionStatus::Missed,
                exception: format!("Run time of job '{}' was missed!", job_id),
                traceback: None,
            },
            JobEventKind::MaxInstances => ExecutionUpdate::Failed {
                status: ExecutionStatus::MaxInstances,
                exception: format!(
                    "Job '{}' reached its maximum number of running instances!",
                    job_id
                ),
                traceback: None,
            },
        };

        self.ledger
            .update(job_id, update)
            .await?
            .ok_or_else(|| missing(job_id))
    }

    /// Consume events from a channel until every sender is dropped.
    pub fn listen(self: Arc<Self>, mut rx: mpsc::Receiver<JobEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                self.publish(event).await;
            }
            debug!("Event channel closed");
        })
    }
}

fn missing(job_id: &str) -> StoreError {
    StoreError::EventTargetMissing(job_id.to_string())
}

#[async_trait]
impl EventSink for EventBridge {
    async fn publish(&self, event: JobEvent) {
        if let Err(e) = self.apply(&event).await {
            error!(
                "Failed to record {} event for job '{}': {}",
                event.kind, event.job_id, e
            );
        }
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
