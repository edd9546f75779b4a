//! Job model.
//!
//! The store is agnostic to the shape of the jobs it persists: anything that
//! implements [`StoredJob`] can be added. [`ScheduledJob`] is the job state an
//! in-process scheduler typically keeps and is what the store ships with.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Trigger classification. Informational only; never used to recompute a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TriggerKind {
    /// Fires once at a fixed date.
    Date,
    /// Fires on a cron expression.
    Cron,
    /// Fires at a fixed interval.
    Interval,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Date => "DATE",
            TriggerKind::Cron => "CRON",
            TriggerKind::Interval => "INTERVAL",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DATE" => Some(TriggerKind::Date),
            "CRON" => Some(TriggerKind::Cron),
            "INTERVAL" => Some(TriggerKind::Interval),
            _ => None,
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A job the store can persist.
///
/// The serialized form must capture everything needed to rebuild an
/// invocable job without consulting any other record.
pub trait StoredJob: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Unique job ID.
    fn id(&self) -> &str;

    /// Trigger classification.
    fn trigger_kind(&self) -> TriggerKind;

    /// Next scheduled run. `None` means the job is paused.
    fn next_run_time(&self) -> Option<DateTime<Utc>>;
}

/// Trigger configuration, as configured by the scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TriggerSpec {
    /// Run once.
    Date { run_date: DateTime<Utc> },

    /// Run every fixed period.
    Interval {
        #[serde(default)]
        weeks: u32,
        #[serde(default)]
        days: u32,
        #[serde(default)]
        hours: u32,
        #[serde(default)]
        minutes: u32,
        #[serde(default)]
        seconds: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_date: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_date: Option<DateTime<Utc>>,
    },

    /// Run on a cron expression.
    Cron {
        expression: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_date: Option<DateTime<Utc>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_date: Option<DateTime<Utc>>,
    },
}

impl TriggerSpec {
    /// Interval trigger of `seconds` without bounds.
    pub fn every_seconds(seconds: u32) -> Self {
        TriggerSpec::Interval {
            weeks: 0,
            days: 0,
            hours: 0,
            minutes: 0,
            seconds,
            start_date: None,
            end_date: None,
        }
    }

    /// Cron trigger without bounds.
    pub fn cron(expression: impl Into<String>) -> Self {
        TriggerSpec::Cron {
            expression: expression.into(),
            start_date: None,
            end_date: None,
        }
    }

    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerSpec::Date { .. } => TriggerKind::Date,
            TriggerSpec::Interval { .. } => TriggerKind::Interval,
            TriggerSpec::Cron { .. } => TriggerKind::Cron,
        }
    }
}

/// Job state kept by an in-process scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledJob {
    /// Unique job ID.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Reference to the callable, e.g. `reports:send_daily`.
    pub func: String,
    /// Positional arguments.
    #[serde(default)]
    pub args: Vec<Value>,
    /// Keyword arguments.
    #[serde(default)]
    pub kwargs: Map<String, Value>,
    /// Trigger configuration.
    pub trigger: TriggerSpec,
    /// Seconds after the designated run time that the job may still run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub misfire_grace_time: Option<u32>,
    /// Collapse a backlog of missed runs into one.
    #[serde(default = "default_coalesce")]
    pub coalesce: bool,
    /// Maximum concurrently running instances.
    #[serde(default = "default_max_instances")]
    pub max_instances: u32,
    /// Next scheduled run. `None` = paused.
    #[serde(default)]
    pub next_run_time: Option<DateTime<Utc>>,
}

fn default_coalesce() -> bool {
    true
}

fn default_max_instances() -> u32 {
    1
}

impl ScheduledJob {
    /// Create a new paused job.
    pub fn new(id: impl Into<String>, func: impl Into<String>, trigger: TriggerSpec) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            func: func.into(),
            args: Vec::new(),
            kwargs: Map::new(),
            trigger,
            misfire_grace_time: None,
            coalesce: default_coalesce(),
            max_instances: default_max_instances(),
            next_run_time: None,
        }
    }

    /// Set the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set positional arguments.
    pub fn with_args(mut self, args: Vec<Value>) -> Self {
        self.args = args;
        self
    }

    /// Add a keyword argument.
    pub fn with_kwarg(mut self, key: impl Into<String>, value: Value) -> Self {
        self.kwargs.insert(key.into(), value);
        self
    }

    /// Set the next run time.
    pub fn with_next_run_time(mut self, time: DateTime<Utc>) -> Self {
        self.next_run_time = Some(time);
        self
    }

    /// Set maximum concurrent instances.
    pub fn with_max_instances(mut self, max: u32) -> Self {
        self.max_instances = max;
        self
    }

    /// Set the misfire grace time in seconds.
    pub fn with_misfire_grace_time(mut self, seconds: u32) -> Self {
        self.misfire_grace_time = Some(seconds);
        self
    }

    /// Pause the job.
    pub fn pause(&mut self) {
        self.next_run_time = None;
    }

    pub fn is_paused(&self) -> bool {
        self.next_run_time.is_none()
    }
}

impl StoredJob for ScheduledJob {
    fn id(&self) -> &str {
        &self.id
    }

    fn trigger_kind(&self) -> TriggerKind {
        self.trigger.kind()
    }

    fn next_run_time(&self) -> Option<DateTime<Utc>> {
        self.next_run_time
    }
}
