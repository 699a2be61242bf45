//! Entry points used by the scheduler, the task queue, the API and the CLI
//!
//! [`IngestService`] wires the lock coordinator around source runs. A sweep over
//! several sources runs them concurrently, each with its own run log; a fetch
//! failure in one source has no effect on the others.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use super::lock::{source_lock_name, LockCoordinator, DAILY_INGESTION_LOCK};
use super::orchestrator::IngestionOrchestrator;
use super::reconcile::{ReconcileReport, ReconcileScope, ReconciliationWorker};
use super::stats::IngestStats;
use crate::sources::{JobSource, SourceError, SourceRegistry, SourceSelector};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    pub selector: String,
    pub lock: String,
    /// Another worker held the lock; nothing ran
    pub locked_out: bool,
    pub runs: Vec<IngestStats>,
}

impl SweepReport {
    pub fn total_new(&self) -> i64 {
        self.runs.iter().map(|r| r.new).sum()
    }

    pub fn failed_sources(&self) -> Vec<&str> {
        self.runs
            .iter()
            .filter(|r| r.fetch_error.is_some())
            .map(|r| r.source.as_str())
            .collect()
    }
}

/// Result of the scheduled job: sweep plus follow-up reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRunReport {
    pub runs: Vec<IngestStats>,
    pub reconcile: Option<ReconcileReport>,
}

pub struct IngestService {
    orchestrator: IngestionOrchestrator,
    reconciler: ReconciliationWorker,
    locks: LockCoordinator,
    sources: SourceRegistry,
    lock_ttl: Duration,
}

impl IngestService {
    pub fn new(
        orchestrator: IngestionOrchestrator,
        reconciler: ReconciliationWorker,
        locks: LockCoordinator,
        sources: SourceRegistry,
        lock_ttl: Duration,
    ) -> Self {
        Self {
            orchestrator,
            reconciler,
            locks,
            sources,
            lock_ttl,
        }
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.sources
    }

    pub fn locks(&self) -> &LockCoordinator {
        &self.locks
    }

    fn lock_name(selector: &SourceSelector) -> String {
        match selector {
            SourceSelector::All => DAILY_INGESTION_LOCK.to_string(),
            SourceSelector::One(name) => source_lock_name(name),
        }
    }

    /// Run the selected sources under the matching lock.
    ///
    /// Fails only for an unknown source name; run-level failures are reported
    /// inside the returned stats.
    #[instrument(skip(self), fields(selector = %selector.label()))]
    pub async fn ingest(&self, selector: &SourceSelector) -> Result<SweepReport, SourceError> {
        let sources = self.sources.resolve(selector)?;
        let lock = Self::lock_name(selector);

        let runs = self
            .locks
            .with_lock(&lock, self.lock_ttl, self.run_sources(&sources))
            .await;

        Ok(SweepReport {
            selector: selector.label().to_string(),
            locked_out: runs.is_none(),
            runs: runs.unwrap_or_default(),
            lock,
        })
    }

    pub async fn reconcile(&self, scope: ReconcileScope) -> ReconcileReport {
        self.reconciler.run(scope).await
    }

    /// The cron job: every source, then a reconciliation pass, all under the
    /// daily lock. Returns `None` when another worker won the lock.
    #[instrument(skip(self))]
    pub async fn scheduled_run(&self) -> Option<ScheduledRunReport> {
        let sources = self.sources.resolve(&SourceSelector::All).unwrap_or_default();

        let report = self
            .locks
            .with_lock(DAILY_INGESTION_LOCK, self.lock_ttl, async {
                let runs = self.run_sources(&sources).await;
                let reconcile = self.reconciler.run(ReconcileScope::Missing).await;
                ScheduledRunReport {
                    runs,
                    reconcile: Some(reconcile),
                }
            })
            .await;

        if let Some(report) = &report {
            info!(
                sources = report.runs.len(),
                new = report.runs.iter().map(|r| r.new).sum::<i64>(),
                "Scheduled ingestion finished"
            );
        }
        report
    }

    async fn run_sources(&self, sources: &[Arc<dyn JobSource>]) -> Vec<IngestStats> {
        join_all(
            sources
                .iter()
                .map(|source| self.orchestrator.run(source.as_ref())),
        )
        .await
    }
}
