//! Enrich job command
//!
//! Runs enrichment for one record synchronously, bounded by
//! `ENRICH_TIMEOUT_SECS`, and activates it on success.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::ingest::enrichment::{EnrichError, EnrichOutcome};
use crate::ingest::store::StoreError;
use crate::models::{JobRecord, JobStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichJobCommand {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichJobResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub enriched: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum EnrichJobError {
    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Enrichment did not finish within {0} seconds")]
    Timeout(u64),

    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Request<Result<EnrichJobResponse, EnrichJobError>> for EnrichJobCommand {}

#[tracing::instrument(skip(ctx, command), fields(job_id = %command.job_id))]
pub async fn handle(
    ctx: &AppContext,
    command: EnrichJobCommand,
) -> Result<EnrichJobResponse, EnrichJobError> {
    let timeout = ctx.config.ingest.enrich_timeout();

    let outcome = tokio::time::timeout(timeout, ctx.enrichment.try_enrich(command.job_id))
        .await
        .map_err(|_| EnrichJobError::Timeout(timeout.as_secs()))?;

    match outcome {
        Ok(EnrichOutcome::Enriched { .. }) => {
            if !ctx.store.set_status(command.job_id, JobStatus::Active).await? {
                return Err(EnrichJobError::NotFound(command.job_id));
            }
        },
        Ok(EnrichOutcome::NotFound) => return Err(EnrichJobError::NotFound(command.job_id)),
        Ok(EnrichOutcome::Failed) => {
            return Err(EnrichJobError::Failed("Enrichment failed".to_string()))
        },
        Err(EnrichError::Store(e)) => return Err(EnrichJobError::Store(e)),
        Err(e) => return Err(EnrichJobError::Failed(e.to_string())),
    }

    let record: JobRecord = ctx
        .store
        .get_job(command.job_id)
        .await?
        .ok_or(EnrichJobError::NotFound(command.job_id))?;

    tracing::info!(company = %record.company_name, title = %record.title, "Job enriched on demand");

    Ok(EnrichJobResponse {
        id: record.id,
        status: record.status,
        enriched: record.is_enriched(),
    })
}
