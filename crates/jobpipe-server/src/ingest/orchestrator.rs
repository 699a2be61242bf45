//! Ingestion orchestrator
//!
//! Executes one run against one source:
//!
//! ```text
//! create run log (running)
//!   └─► fetch ──✗──► run log failed, return
//!         └─► for each posting (own error boundary)
//!               ├─ identity exists ───────────────► skipped
//!               ├─ insert (processing)
//!               ├─ hash donor found ─► clone ─────► new, dedup hit
//!               └─ enrich ─► active ──────────────► new
//!   └─► run log success | partial | failed
//! ```
//!
//! Postings are handled sequentially in fetch order so dedup decisions within a
//! run never race each other. Nothing here returns an error to the caller.

use anyhow::Context;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::dedup::{DedupEngine, IdentityDecision};
use super::enrichment::{EnrichOutcome, EnrichmentOrchestrator};
use super::stats::IngestStats;
use super::store::JobStore;
use crate::models::{JobStatus, NewJob, RawPosting, RunOutcome};
use crate::sources::JobSource;

/// Where a single posting ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PostingOutcome {
    Skipped,
    New,
    DedupHit,
}

#[derive(Clone)]
pub struct IngestionOrchestrator {
    store: Arc<dyn JobStore>,
    dedup: DedupEngine,
    enrichment: EnrichmentOrchestrator,
}

impl IngestionOrchestrator {
    pub fn new(store: Arc<dyn JobStore>, enrichment: EnrichmentOrchestrator) -> Self {
        Self {
            dedup: DedupEngine::new(store.clone()),
            store,
            enrichment,
        }
    }

    #[instrument(skip(self, source), fields(source = %source.name(), company = %source.company()))]
    pub async fn run(&self, source: &dyn JobSource) -> IngestStats {
        let mut stats = IngestStats::new(source.name());

        let run_log = match self.store.create_run_log(source.name()).await {
            Ok(log) => Some(log),
            Err(e) => {
                warn!(error = %e, "Failed to create run log, continuing without audit row");
                None
            },
        };
        stats.run_id = run_log.as_ref().map(|log| log.id);

        let postings = match source
            .fetch()
            .await
            .with_context(|| format!("Failed to fetch {} postings", source.name()))
        {
            Ok(postings) => postings,
            Err(e) => {
                error!(error = ?e, "Source fetch failed");
                stats.fetch_error = Some(format!("{:#}", e));
                self.finish(&stats, RunOutcome::fetch_failed(&e)).await;
                return stats;
            },
        };

        stats.fetched = i64::try_from(postings.len()).unwrap_or(i64::MAX);
        info!(fetched = stats.fetched, "Fetched postings");

        for posting in &postings {
            match self.process(posting).await {
                Ok(PostingOutcome::Skipped) => stats.inc_skipped(),
                Ok(PostingOutcome::New) => stats.inc_new(),
                Ok(PostingOutcome::DedupHit) => stats.inc_dedup_hit(),
                Err(e) => {
                    error!(
                        company = %posting.company_name,
                        external_id = %posting.external_id,
                        error = ?e,
                        "Failed to process posting"
                    );
                    stats.inc_errors();
                },
            }
        }

        self.finish(&stats, stats.outcome()).await;

        info!(
            status = %stats.status(),
            new = stats.new,
            skipped = stats.skipped,
            errors = stats.errors,
            dedup_hits = stats.dedup_hits,
            "Ingestion run finished"
        );
        stats
    }

    async fn process(&self, posting: &RawPosting) -> anyhow::Result<PostingOutcome> {
        if let IdentityDecision::Existing(id) = self.dedup.check_identity(posting).await? {
            debug!(job_id = %id, external_id = %posting.external_id, "Skipping known posting");
            return Ok(PostingOutcome::Skipped);
        }

        let record = match self.store.insert_job(NewJob::from(posting)).await {
            Ok(record) => record,
            // a concurrent run inserted the same identity between check and insert
            Err(e) if e.is_duplicate() => {
                debug!(external_id = %posting.external_id, "Lost insert race, skipping");
                return Ok(PostingOutcome::Skipped);
            },
            Err(e) => return Err(e).context("Failed to insert job"),
        };

        if let Some(donor) = self.dedup.find_donor(&record).await? {
            let cloned = self
                .store
                .clone_enrichment(record.id, &donor)
                .await
                .context("Failed to clone enrichment")?;
            if !cloned {
                warn!(job_id = %record.id, "Job deleted before enrichment could be cloned");
                return Ok(PostingOutcome::Skipped);
            }
            debug!(job_id = %record.id, donor_id = %donor.id, "Reused enrichment from identical description");
            return Ok(PostingOutcome::DedupHit);
        }

        match self.enrichment.enrich(record.id).await {
            EnrichOutcome::Enriched { .. } => {
                self.store
                    .set_status(record.id, JobStatus::Active)
                    .await
                    .context("Failed to activate job")?;
            },
            EnrichOutcome::NotFound | EnrichOutcome::Failed => {
                warn!(job_id = %record.id, "Job left in processing until reconciliation");
            },
        }

        Ok(PostingOutcome::New)
    }

    async fn finish(&self, stats: &IngestStats, outcome: RunOutcome) {
        let Some(run_id) = stats.run_id else {
            return;
        };
        if let Err(e) = self.store.finish_run_log(run_id, &outcome).await {
            error!(run_id = %run_id, error = %e, "Failed to finalize run log");
        }
    }
}
