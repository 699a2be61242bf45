//! Single-record enrichment
//!
//! Loads a record, asks the generator for guidance and the embedder for a
//! vector, and writes everything back in one store call. [`EnrichmentOrchestrator::enrich`]
//! never fails: errors are logged with the record's context and reported as
//! [`EnrichOutcome::Failed`], leaving healing to the reconciliation sweep.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, instrument, warn};
use uuid::Uuid;

use super::store::{EnrichmentUpdate, JobStore, StoreError};
use crate::ai::{Embedder, GenerationRequest, Generator};
use crate::models::{JobRecord, JobStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Fields written; carries the record's status before the write
    Enriched { previous_status: JobStatus },
    /// Record vanished before or during enrichment
    NotFound,
    /// Some step failed; nothing was written
    Failed,
}

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Generation failed: {0:#}")]
    Generation(anyhow::Error),

    #[error("Embedding failed: {0:#}")]
    Embedding(anyhow::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct EnrichmentOrchestrator {
    store: Arc<dyn JobStore>,
    generator: Arc<dyn Generator>,
    embedder: Arc<dyn Embedder>,
}

impl EnrichmentOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
    ) -> Self {
        Self {
            store,
            generator,
            embedder,
        }
    }

    /// Enrich `id`, logging and absorbing any failure
    pub async fn enrich(&self, id: Uuid) -> EnrichOutcome {
        match self.try_enrich(id).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // try_enrich already logged with full record context
                debug!(job_id = %id, error = %e, "Enrichment absorbed");
                EnrichOutcome::Failed
            },
        }
    }

    /// Enrich `id`, returning the error to callers that count failures
    #[instrument(skip(self), fields(job_id = %id))]
    pub async fn try_enrich(&self, id: Uuid) -> Result<EnrichOutcome, EnrichError> {
        let Some(job) = self.store.get_job(id).await? else {
            warn!("Job not found, skipping enrichment");
            return Ok(EnrichOutcome::NotFound);
        };

        match self.enrich_record(&job).await {
            Ok(true) => {
                debug!(company = %job.company_name, title = %job.title, "Job enriched");
                Ok(EnrichOutcome::Enriched {
                    previous_status: job.status,
                })
            },
            Ok(false) => {
                warn!("Job deleted during enrichment");
                Ok(EnrichOutcome::NotFound)
            },
            Err(e) => {
                error!(
                    company = %job.company_name,
                    title = %job.title,
                    external_id = %job.external_id,
                    error = %e,
                    "Enrichment failed"
                );
                Err(e)
            },
        }
    }

    async fn enrich_record(&self, job: &JobRecord) -> Result<bool, EnrichError> {
        let enrichment = self
            .generator
            .generate(&GenerationRequest::from(job))
            .await
            .and_then(|e| e.validate().map(|_| e))
            .map_err(EnrichError::Generation)?;

        let embedding = self
            .embedder
            .encode(&job.description)
            .await
            .map_err(EnrichError::Embedding)?;

        let skills = if job.skills.is_empty() {
            enrichment.extracted_skills
        } else {
            job.skills.clone()
        };

        let update = EnrichmentUpdate {
            resume_guide: enrichment.resume_guide,
            prep_questions: enrichment.prep_questions,
            skills,
            embedding,
            salary_range: enrichment
                .estimated_salary_range
                .or_else(|| job.salary_range.clone()),
        };

        Ok(self.store.save_enrichment(job.id, update).await?)
    }
}
