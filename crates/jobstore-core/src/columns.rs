//! Column encoding helpers for SQLite.
//!
//! Timestamps are stored as INTEGER microseconds since the Unix epoch. Every
//! `DateTime<Utc>` fits, and integer order in the index equals chronological
//! order across the whole range.

use chrono::{DateTime, Utc};
use rusqlite::types::Type;

pub(crate) fn to_db(ts: &DateTime<Utc>) -> i64 {
    ts.timestamp_micros()
}

pub(crate) fn from_db(column: usize, value: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            Type::Integer,
            format!("timestamp out of range: {}", value).into(),
        )
    })
}

pub(crate) fn opt_from_db(column: usize, value: Option<i64>) -> rusqlite::Result<Option<DateTime<Utc>>> {
    value.map(|v| from_db(column, v)).transpose()
}

/// Conversion failure for a text column holding an unexpected value.
pub(crate) fn invalid_text(column: usize, what: &str, value: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        column,
        Type::Text,
        format!("unknown {}: {:?}", what, value).into(),
    )
}
