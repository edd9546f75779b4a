use super::*;
use crate::job::TriggerKind;
use crate::ledger::SqliteExecutionLedger;
use crate::sqlite::open_in_memory;
use chrono::{Duration, TimeZone};

fn base() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap()
}

fn record(id: &str, next_run_time: Option<DateTime<Utc>>) -> JobRecord {
    JobRecord::new(id, next_run_time, TriggerKind::Interval, id.as_bytes().to_vec())
}

fn ids(records: &[JobRecord]) -> Vec<&str> {
    records.iter().map(|r| r.id.as_str()).collect()
}

#[tokio::test]
async fn test_memory_store_insert_and_lookup() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("a", Some(base()))).await.unwrap();

    let loaded = store.lookup("a").await.unwrap().unwrap();
    assert_eq!(loaded.state, b"a".to_vec());
    assert!(store.lookup("missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_store_conflicting_id() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("a", Some(base()))).await.unwrap();

    let result = store.insert(record("a", None)).await;
    assert!(matches!(result, Err(StoreError::ConflictingId(id)) if id == "a"));

    // Original record untouched
    let loaded = store.lookup("a").await.unwrap().unwrap();
    assert_eq!(loaded.next_run_time, Some(base()));
}

#[tokio::test]
async fn test_memory_store_due_ordering() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("late", Some(base() + Duration::minutes(5)))).await.unwrap();
    store.insert(record("tie-1", Some(base()))).await.unwrap();
    store.insert(record("future", Some(base() + Duration::hours(1)))).await.unwrap();
    store.insert(record("tie-2", Some(base()))).await.unwrap();
    store.insert(record("paused", None)).await.unwrap();

    let due = store.due(base() + Duration::minutes(5)).await.unwrap();
    assert_eq!(ids(&due), vec!["tie-1", "tie-2", "late"]);

    let none = store.due(base() - Duration::seconds(1)).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_memory_store_all_puts_paused_last() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("paused-1", None)).await.unwrap();
    store.insert(record("b", Some(base() + Duration::minutes(1)))).await.unwrap();
    store.insert(record("paused-2", None)).await.unwrap();
    store.insert(record("a", Some(base()))).await.unwrap();

    let all = store.all().await.unwrap();
    assert_eq!(ids(&all), vec!["a", "b", "paused-1", "paused-2"]);
}

#[tokio::test]
async fn test_memory_store_next_run_time() {
    let store = MemoryJobRecordStore::new();
    assert_eq!(store.next_run_time().await.unwrap(), None);

    store.insert(record("paused", None)).await.unwrap();
    assert_eq!(store.next_run_time().await.unwrap(), None);

    store.insert(record("b", Some(base() + Duration::minutes(1)))).await.unwrap();
    store.insert(record("a", Some(base()))).await.unwrap();
    assert_eq!(store.next_run_time().await.unwrap(), Some(base()));
}

#[tokio::test]
async fn test_memory_store_replace_reschedules() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("a", Some(base()))).await.unwrap();
    store.insert(record("b", Some(base() + Duration::minutes(1)))).await.unwrap();

    store.replace(record("a", Some(base() + Duration::minutes(2)))).await.unwrap();
    assert_eq!(
        store.next_run_time().await.unwrap(),
        Some(base() + Duration::minutes(1))
    );

    // Pausing removes it from the schedule
    store.replace(record("b", None)).await.unwrap();
    let due = store.due(base() + Duration::hours(1)).await.unwrap();
    assert_eq!(ids(&due), vec!["a"]);

    let result = store.replace(record("missing", None)).await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_memory_store_remove() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("a", Some(base()))).await.unwrap();

    store.remove("a").await.unwrap();
    assert!(store.lookup("a").await.unwrap().is_none());
    assert_eq!(store.next_run_time().await.unwrap(), None);

    let result = store.remove("a").await;
    assert!(matches!(result, Err(StoreError::NotFound(_))));
}

#[tokio::test]
async fn test_memory_store_purge_skips_missing() {
    let store = MemoryJobRecordStore::new();
    store.insert(record("a", Some(base()))).await.unwrap();
    store.insert(record("b", None)).await.unwrap();

    let removed = store
        .purge(&[record("a", Some(base())), record("ghost", None)])
        .await
        .unwrap();
    assert_eq!(removed, 1);
    assert_eq!(ids(&store.all().await.unwrap()), vec!["b"]);
}

#[tokio::test]
async fn test_memory_store_purge_keeps_replaced_record() {
    let store = MemoryJobRecordStore::new();
    let stale = record("a", Some(base()));
    store.insert(stale.clone()).await.unwrap();

    let repaired = JobRecord::new("a", Some(base()), TriggerKind::Interval, b"fixed".to_vec());
    store.replace(repaired.clone()).await.unwrap();

    assert_eq!(store.purge(&[stale]).await.unwrap(), 0);
    assert_eq!(store.lookup("a").await.unwrap(), Some(repaired));
    assert_eq!(store.next_run_time().await.unwrap(), Some(base()));
}

#[tokio::test]
async fn test_memory_store_far_future_run_time() {
    let store = MemoryJobRecordStore::new();
    let far = Utc.with_ymd_and_hms(10000, 1, 1, 0, 0, 0).unwrap();
    store.insert(record("far", Some(far))).await.unwrap();
    store.insert(record("soon", Some(base()))).await.unwrap();

    assert_eq!(ids(&store.due(base()).await.unwrap()), vec!["soon"]);
    assert_eq!(ids(&store.all().await.unwrap()), vec!["soon", "far"]);
    assert_eq!(store.next_run_time().await.unwrap(), Some(base()));
}

#[tokio::test]
async fn test_memory_store_cascades_to_ledger() {
    let ledger = Arc::new(SqliteExecutionLedger::new(open_in_memory().await.unwrap(), 1000));
    let store = MemoryJobRecordStore::with_ledger(ledger.clone());

    store.insert(record("a", Some(base()))).await.unwrap();
    store.insert(record("b", Some(base()))).await.unwrap();
    ledger.open("a", TriggerKind::Interval, base()).await.unwrap();
    ledger.open("b", TriggerKind::Interval, base()).await.unwrap();
    ledger.open("orphan", TriggerKind::Date, base()).await.unwrap();

    store.remove("a").await.unwrap();
    assert!(ledger.find("a").await.unwrap().is_none());
    assert!(ledger.find("b").await.unwrap().is_some());

    assert_eq!(store.remove_all().await.unwrap(), 1);
    assert!(ledger.find("b").await.unwrap().is_none());

    // Records without a job are left alone
    assert!(ledger.find("orphan").await.unwrap().is_some());
}
