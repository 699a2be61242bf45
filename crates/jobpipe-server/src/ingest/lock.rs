//! Distributed lock coordinator
//!
//! Several server processes may share one schedule. Before a scheduled run
//! starts, each of them races for a named row in the lock table; the atomic
//! conditional write in [`LockStore::try_acquire`] lets exactly one win while the
//! lock is unexpired. Expiry (`locked_until`) doubles as crash recovery: a holder
//! that dies simply stops renewing and the lock becomes acquirable again after
//! its TTL.
//!
//! When the lock store itself is unreachable the coordinator fails open and the
//! caller proceeds unlocked. Single-worker deployments keep running even without
//! the lock table.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::store::StoreResult;

/// Lock name used by the scheduled all-source sweep
pub const DAILY_INGESTION_LOCK: &str = "daily_ingestion";

/// Default lock TTL. Must exceed the longest expected run.
pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(30 * 60);

/// Lock name for a manual single-source run
pub fn source_lock_name(source: &str) -> String {
    format!("ingestion:{}", source)
}

#[async_trait]
pub trait LockStore: Send + Sync {
    /// Create the lock row, or take it over if its expiry has passed, in one
    /// atomic statement. Returns true iff the caller now holds the lock.
    async fn try_acquire(&self, name: &str, ttl: Duration, holder: &str) -> StoreResult<bool>;

    /// Set the lock's expiry to an instant in the past
    async fn release(&self, name: &str) -> StoreResult<()>;
}

#[derive(Clone)]
pub struct LockCoordinator {
    store: Arc<dyn LockStore>,
    holder: String,
}

impl LockCoordinator {
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            holder: default_holder(),
        }
    }

    pub fn with_holder(mut self, holder: impl Into<String>) -> Self {
        self.holder = holder.into();
        self
    }

    /// Try to take `name` for `ttl`. Store errors fail open.
    pub async fn acquire(&self, name: &str, ttl: Duration) -> bool {
        match self.store.try_acquire(name, ttl, &self.holder).await {
            Ok(true) => {
                debug!(lock = name, holder = %self.holder, ttl_secs = ttl.as_secs(), "Lock acquired");
                true
            },
            Ok(false) => {
                debug!(lock = name, "Lock held by another worker");
                false
            },
            Err(e) => {
                warn!(lock = name, error = %e, "Lock store unavailable, proceeding without lock");
                true
            },
        }
    }

    /// Best-effort release; the TTL bounds the damage of a failed release.
    pub async fn release(&self, name: &str) {
        if let Err(e) = self.store.release(name).await {
            warn!(lock = name, error = %e, "Failed to release lock");
        }
    }

    /// Run `task` only if `name` can be acquired, releasing it afterwards.
    /// Returns `None` when another worker holds the lock.
    pub async fn with_lock<F, T>(&self, name: &str, ttl: Duration, task: F) -> Option<T>
    where
        F: Future<Output = T>,
    {
        if !self.acquire(name, ttl).await {
            info!(lock = name, "Skipping run, lock held elsewhere");
            return None;
        }

        let output = task.await;
        self.release(name).await;
        Some(output)
    }
}

/// `hostname:pid` of this process
fn default_holder() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string());
    format!("{}:{}", host, std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::store::StoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct BrokenStore {
        releases: AtomicUsize,
    }

    #[async_trait]
    impl LockStore for BrokenStore {
        async fn try_acquire(&self, _: &str, _: Duration, _: &str) -> StoreResult<bool> {
            Err(StoreError::Unavailable("relation \"cron_locks\" does not exist".into()))
        }

        async fn release(&self, _: &str) -> StoreResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_fails_open() {
        let store = Arc::new(BrokenStore {
            releases: AtomicUsize::new(0),
        });
        let coordinator = LockCoordinator::new(store.clone());

        assert!(coordinator.acquire(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL).await);

        let ran = coordinator
            .with_lock(DAILY_INGESTION_LOCK, DEFAULT_LOCK_TTL, async { 7 })
            .await;
        assert_eq!(ran, Some(7));
        assert_eq!(store.releases.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_holder_identity() {
        let holder = default_holder();
        let pid = std::process::id().to_string();
        assert!(holder.ends_with(&pid));
        assert!(holder.contains(':'));
        assert_eq!(source_lock_name("pwc"), "ingestion:pwc");
    }
}
