//! Distributed lock tests against the in-memory lock table

use chrono::{TimeZone, Utc};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;

use jobpipe_server::ingest::lock::{source_lock_name, DEFAULT_LOCK_TTL};
use jobpipe_server::ingest::{InMemoryLockStore, LockCoordinator, LockStore, DAILY_INGESTION_LOCK};
use jobpipe_server::testing::ManualClock;

#[tokio::test]
async fn test_concurrent_acquire_has_one_winner() {
    let store = Arc::new(InMemoryLockStore::new());

    let attempts = (0..16).map(|worker| {
        let coordinator =
            LockCoordinator::new(store.clone()).with_holder(format!("worker-{}:{}", worker, worker));
        async move { coordinator.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await }
    });
    let results = join_all(attempts).await;

    assert_eq!(results.iter().filter(|won| **won).count(), 1);
    assert!(store.holder(DAILY_INGESTION_LOCK).await.is_some());
}

#[tokio::test]
async fn test_lock_expires_after_ttl() {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 10, 1, 16, 30, 0).unwrap());
    let store = Arc::new(InMemoryLockStore::with_clock(clock.clock()));
    let worker_a = LockCoordinator::new(store.clone()).with_holder("host-a:100");
    let worker_b = LockCoordinator::new(store.clone()).with_holder("host-b:200");

    assert!(worker_a.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);

    clock.advance(Duration::from_secs(5 * 60));
    assert!(!worker_b.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);
    assert_eq!(store.holder(DAILY_INGESTION_LOCK).await.as_deref(), Some("host-a:100"));

    // worker A crashed without releasing
    clock.advance(Duration::from_secs(26 * 60));
    assert!(worker_b.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);
    assert_eq!(store.holder(DAILY_INGESTION_LOCK).await.as_deref(), Some("host-b:200"));
}

#[tokio::test]
async fn test_release_frees_lock_immediately() {
    let store = Arc::new(InMemoryLockStore::new());
    let worker_a = LockCoordinator::new(store.clone()).with_holder("host-a:1");
    let worker_b = LockCoordinator::new(store.clone()).with_holder("host-b:2");

    assert!(worker_a.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);
    assert!(!worker_b.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);

    worker_a.release(DAILY_INGESTION_LOCK).await;
    assert!(store.holder(DAILY_INGESTION_LOCK).await.is_none());
    assert!(worker_b.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);
}

#[tokio::test]
async fn test_with_lock_skips_when_held() {
    let store = Arc::new(InMemoryLockStore::new());
    let lock = source_lock_name("pwc");
    assert!(store.try_acquire(&lock, DEFAULT_LOCK_TTL, "other:9").await.unwrap());

    let coordinator = LockCoordinator::new(store.clone());
    let ran = coordinator.with_lock(&lock, DEFAULT_LOCK_TTL, async { "ran" }).await;
    assert_eq!(ran, None);

    // names are independent
    let ran = coordinator
        .with_lock(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL, async { "ran" })
        .await;
    assert_eq!(ran, Some("ran"));
    assert!(store.holder(DAILY_INGESTION_LOCK).await.is_none());
}

#[test]
fn test_source_lock_name() {
    assert_eq!(source_lock_name("deloitte"), "ingestion:deloitte");
}
