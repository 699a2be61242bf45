//! Get job query
//!
//! Status view of a single record, including whether its enrichment landed.

use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ingest::store::{JobStore, StoreError};
use crate::models::{JobRecord, JobStatus, PrepQuestion};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobQuery {
    pub job_id: Uuid,
}

/// Job details
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobView {
    pub id: Uuid,
    pub company_name: String,
    pub external_id: String,
    pub title: String,
    pub apply_url: String,
    pub location: Option<String>,
    pub salary_range: Option<String>,
    pub skills: Vec<String>,
    pub status: JobStatus,
    pub enriched: bool,
    pub resume_guide: Option<Vec<String>>,
    pub prep_questions: Option<Vec<PrepQuestion>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<JobRecord> for JobView {
    fn from(record: JobRecord) -> Self {
        Self {
            enriched: record.is_enriched(),
            id: record.id,
            company_name: record.company_name,
            external_id: record.external_id,
            title: record.title,
            apply_url: record.apply_url,
            location: record.location,
            salary_range: record.salary_range,
            skills: record.skills,
            status: record.status,
            resume_guide: record.resume_guide,
            prep_questions: record.prep_questions,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobError {
    #[error("Job not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Request<Result<JobView, GetJobError>> for GetJobQuery {}

pub async fn handle(store: &dyn JobStore, query: GetJobQuery) -> Result<JobView, GetJobError> {
    store
        .get_job(query.job_id)
        .await?
        .map(JobView::from)
        .ok_or(GetJobError::NotFound)
}
