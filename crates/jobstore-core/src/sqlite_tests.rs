use super::*;
use crate::ledger::{ExecutionLedger, SqliteExecutionLedger};
use chrono::{Duration, TimeZone};
use jobstore_config::StoreConfig;
use tempfile::TempDir;

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

fn record(id: &str, next_run_time: Option<DateTime<Utc>>) -> JobRecord {
    JobRecord::new(id, next_run_time, TriggerKind::Cron, vec![1, 2, 3])
}

fn ids(records: &[JobRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

async fn store() -> SqliteJobRecordStore {
    SqliteJobRecordStore::new(open_in_memory().await.unwrap())
}

#[tokio::test]
async fn test_open_connection_creates_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig {
        path: temp_dir.path().join("nested").join("jobs.db"),
        ..StoreConfig::default()
    };

    let conn = open_connection(&config).await.unwrap();
    assert!(config.path.exists());

    let mode: String = conn
        .call(|conn| Ok(conn.pragma_query_value(None, "journal_mode", |row| row.get(0))?))
        .await
        .unwrap();
    assert_eq!(mode.to_lowercase(), "wal");
}

#[tokio::test]
async fn test_file_store_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let config = StoreConfig {
        path: temp_dir.path().join("jobs.db"),
        ..StoreConfig::default()
    };

    let store = SqliteJobRecordStore::new(open_connection(&config).await.unwrap());
    store.insert(record("a", Some(base()))).await.unwrap();
    store.shutdown().await.unwrap();

    let reopened = SqliteJobRecordStore::new(open_connection(&config).await.unwrap());
    let loaded = reopened.lookup("a").await.unwrap().unwrap();
    assert_eq!(loaded, record("a", Some(base())));
}

#[tokio::test]
async fn test_insert_conflict() {
    let store = store().await;
    store.insert(record("a", Some(base()))).await.unwrap();

    let result = store.insert(record("a", None)).await;
    assert!(matches!(result, Err(StoreError::ConflictingId(id)) if id == "a"));
}

#[tokio::test]
async fn test_due_and_all_ordering() {
    let store = store().await;
    store.insert(record("paused-1", None)).await.unwrap();
    store.insert(record("late", Some(base() + Duration::minutes(5)))).await.unwrap();
    store.insert(record("tie-1", Some(base()))).await.unwrap();
    store.insert(record("future", Some(base() + Duration::hours(1)))).await.unwrap();
    store.insert(record("tie-2", Some(base()))).await.unwrap();

    let due = store.due(base() + Duration::minutes(5)).await.unwrap();
    assert_eq!(ids(&due), vec!["tie-1", "tie-2", "late"]);

    let all = store.all().await.unwrap();
    assert_eq!(ids(&all), vec!["tie-1", "tie-2", "late", "future", "paused-1"]);
}

#[tokio::test]
async fn test_next_run_time_ignores_paused() {
    let store = store().await;
    assert_eq!(store.next_run_time().await.unwrap(), None);

    store.insert(record("paused", None)).await.unwrap();
    assert_eq!(store.next_run_time().await.unwrap(), None);

    store.insert(record("a", Some(base() + Duration::seconds(30)))).await.unwrap();
    assert_eq!(
        store.next_run_time().await.unwrap(),
        Some(base() + Duration::seconds(30))
    );
}

#[tokio::test]
async fn test_replace() {
    let store = store().await;
    store.insert(record("a", Some(base()))).await.unwrap();

    let mut updated = record("a", None);
    updated.trigger_kind = TriggerKind::Date;
    updated.state = vec![9];
    store.replace(updated.clone()).await.unwrap();
    assert_eq!(store.lookup("a").await.unwrap(), Some(updated));

    let result = store.replace(record("missing", None)).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_remove_cascades_executions() {
    let conn = open_in_memory().await.unwrap();
    let store = SqliteJobRecordStore::new(conn.clone());
    let ledger = SqliteExecutionLedger::new(conn, 1000);

    store.insert(record("a", Some(base()))).await.unwrap();
    ledger.open("a", TriggerKind::Cron, base()).await.unwrap();
    ledger.open("orphan", TriggerKind::Cron, base()).await.unwrap();

    store.remove("a").await.unwrap();
    assert!(store.lookup("a").await.unwrap().is_none());
    assert!(ledger.find("a").await.unwrap().is_none());

    // A failed removal leaves unrelated ledger records alone
    let result = store.remove("orphan").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
    assert!(ledger.find("orphan").await.unwrap().is_some());
}

#[tokio::test]
async fn test_remove_all_and_purge() {
    let conn = open_in_memory().await.unwrap();
    let store = SqliteJobRecordStore::new(conn.clone());
    let ledger = SqliteExecutionLedger::new(conn, 1000);

    for id in ["a", "b", "c"] {
        store.insert(record(id, Some(base()))).await.unwrap();
        ledger.open(id, TriggerKind::Cron, base()).await.unwrap();
    }
    ledger.open("orphan", TriggerKind::Cron, base()).await.unwrap();

    let purged = store
        .purge(&[record("a", Some(base())), record("ghost", None)])
        .await
        .unwrap();
    assert_eq!(purged, 1);
    assert!(ledger.find("a").await.unwrap().is_none());

    assert_eq!(store.remove_all().await.unwrap(), 2);
    assert!(store.all().await.unwrap().is_empty());
    assert_eq!(ledger.count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_corrupt_trigger_kind_is_reported() {
    let conn = open_in_memory().await.unwrap();
    conn.call(|conn| {
        Ok(conn.execute(
            "INSERT INTO jobs (id, next_run_time, trigger_kind, job_state) VALUES ('x', NULL, 'WEEKLY', x'01')",
            [],
        )?)
    })
    .await
    .unwrap();

    let store = SqliteJobRecordStore::new(conn);
    assert!(matches!(store.lookup("x").await, Err(StoreError::Database(_))));
}

#[tokio::test]
async fn test_purge_keeps_replaced_record() {
    let conn = open_in_memory().await.unwrap();
    let store = SqliteJobRecordStore::new(conn.clone());
    let ledger = SqliteExecutionLedger::new(conn, 1000);

    let stale = record("a", Some(base()));
    store.insert(stale.clone()).await.unwrap();
    ledger.open("a", TriggerKind::Cron, base()).await.unwrap();

    let mut repaired = stale.clone();
    repaired.state = vec![7, 7];
    store.replace(repaired.clone()).await.unwrap();

    assert_eq!(store.purge(&[stale]).await.unwrap(), 0);
    assert_eq!(store.lookup("a").await.unwrap(), Some(repaired));
    assert!(ledger.find("a").await.unwrap().is_some());
}

#[tokio::test]
async fn test_run_time_past_year_9999() {
    let store = store().await;
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    store.insert(record("far", Some(far))).await.unwrap();
    store.insert(record("soon", Some(base()))).await.unwrap();

    assert_eq!(ids(&store.due(base()).await.unwrap()), vec!["soon"]);
    assert_eq!(ids(&store.all().await.unwrap()), vec!["soon", "far"]);
    assert_eq!(store.next_run_time().await.unwrap(), Some(base()));
    assert_eq!(
        store.lookup("far").await.unwrap().unwrap().next_run_time,
        Some(far)
    );
}

#[tokio::test]
async fn test_run_time_before_epoch_orders_first() {
    let store = store().await;
    let old = Utc.with_ymd_and_hms(1960, 1, 1, 0, 0, 0).unwrap();
    store.insert(record("now", Some(base()))).await.unwrap();
    store.insert(record("old", Some(old))).await.unwrap();

    assert_eq!(ids(&store.due(base()).await.unwrap()), vec!["old", "now"]);
    assert_eq!(store.next_run_time().await.unwrap(), Some(old));
}
