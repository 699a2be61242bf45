//! Reconciliation sweep
//!
//! Finds records whose enrichment never landed (guide, questions or embedding
//! missing) and runs them through enrichment again. Candidates are processed in
//! small batches with a pause in between so the AI providers' rate limits hold;
//! inside a batch a bounded number of records run concurrently. A failing record
//! is counted and the sweep moves on.

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::config::ReconcileConfig;
use super::enrichment::{EnrichOutcome, EnrichmentOrchestrator};
use super::store::JobStore;
use crate::models::JobStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReconcileScope {
    /// Records missing any enrichment field
    #[default]
    Missing,
    /// Every active record, e.g. after a prompt or model change
    All,
}

impl std::str::FromStr for ReconcileScope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "missing" => Ok(ReconcileScope::Missing),
            "all" => Ok(ReconcileScope::All),
            other => Err(anyhow::anyhow!("Invalid reconcile scope: {}", other)),
        }
    }
}

impl std::fmt::Display for ReconcileScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileScope::Missing => f.write_str("missing"),
            ReconcileScope::All => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub scope: ReconcileScope,
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Candidates deleted while the sweep was running
    pub vanished: usize,
    /// `processing` records moved to `active`
    pub repaired: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Healed {
    Enriched { repaired: bool },
    Vanished,
    Failed,
}

#[derive(Clone)]
pub struct ReconciliationWorker {
    store: Arc<dyn JobStore>,
    enrichment: EnrichmentOrchestrator,
    config: ReconcileConfig,
}

impl ReconciliationWorker {
    pub fn new(
        store: Arc<dyn JobStore>,
        enrichment: EnrichmentOrchestrator,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            enrichment,
            config,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, scope: ReconcileScope) -> ReconcileReport {
        let mut report = ReconcileReport {
            scope,
            ..Default::default()
        };

        let candidates = match scope {
            ReconcileScope::Missing => self.store.list_missing_enrichment().await,
            ReconcileScope::All => self.store.list_active().await,
        };
        let candidates = match candidates {
            Ok(ids) => ids,
            Err(e) => {
                error!(error = %e, "Failed to list reconciliation candidates");
                return report;
            },
        };

        report.candidates = candidates.len();
        if candidates.is_empty() {
            info!("Nothing to reconcile");
            return report;
        }
        info!(candidates = report.candidates, "Starting reconciliation");

        let batch_size = self.config.batch_size.max(1);
        let concurrency = self.config.concurrency.max(1);

        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.batch_pause()).await;
            }

            let results: Vec<Healed> = stream::iter(batch.iter().copied())
                .map(|id| self.heal(id))
                .buffer_unordered(concurrency)
                .collect()
                .await;

            for healed in results {
                match healed {
                    Healed::Enriched { repaired } => {
                        report.succeeded += 1;
                        if repaired {
                            report.repaired += 1;
                        }
                    },
                    Healed::Vanished => report.vanished += 1,
                    Healed::Failed => report.failed += 1,
                }
            }
        }

        info!(
            succeeded = report.succeeded,
            failed = report.failed,
            vanished = report.vanished,
            repaired = report.repaired,
            "Reconciliation finished"
        );
        report
    }

    async fn heal(&self, id: Uuid) -> Healed {
        match self.enrichment.try_enrich(id).await {
            Ok(EnrichOutcome::Enriched { previous_status }) => {
                if previous_status != JobStatus::Processing {
                    return Healed::Enriched { repaired: false };
                }
                match self.store.set_status(id, JobStatus::Active).await {
                    Ok(true) => Healed::Enriched { repaired: true },
                    Ok(false) => Healed::Vanished,
                    Err(e) => {
                        warn!(job_id = %id, error = %e, "Enriched but failed to activate");
                        Healed::Failed
                    },
                }
            },
            Ok(EnrichOutcome::NotFound) => Healed::Vanished,
            Ok(EnrichOutcome::Failed) | Err(_) => Healed::Failed,
        }
    }
}
