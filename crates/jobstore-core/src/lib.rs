//! # jobstore Core
//!
//! Durable job store for in-process schedulers.
//!
//! ## Features
//!
//! - Job records with due-time queries (SQLite or in-memory)
//! - Versioned job serialization with quarantine of unreadable records
//! - Execution ledger fed by scheduler lifecycle events
//! - `JobStore` facade with direct or channel-based event delivery

mod columns;

pub mod bridge;
pub mod error;
pub mod events;
pub mod job;
pub mod ledger;
pub mod record;
pub mod schema;
pub mod serializer;
pub mod service;
pub mod sqlite;
pub mod store;

pub use bridge::{EventBridge, EventSink};
pub use error::{DecodeError, StoreError, StoreResult};
pub use events::{JobEvent, JobEventKind};
pub use job::{ScheduledJob, StoredJob, TriggerKind, TriggerSpec};
pub use ledger::{
    ExecutionLedger, ExecutionRecord, ExecutionStatus, ExecutionUpdate, SqliteExecutionLedger,
};
pub use record::JobRecord;
pub use serializer::JobSerializer;
pub use service::JobStore;
pub use sqlite::{open_connection, open_in_memory, SqliteJobRecordStore};
pub use store::{JobRecordStore, MemoryJobRecordStore};
