//! Persistence capability used by the pipeline
//!
//! [`JobStore`] is the only shared mutable resource the pipeline touches. Two
//! implementations exist: [`crate::db::jobs::PgJobStore`] for deployments and
//! [`crate::ingest::memory::InMemoryJobStore`] for single-process runs and tests.
//! Both enforce uniqueness of `(company_name, external_id)` on insert.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{JobRecord, JobStatus, NewJob, PrepQuestion, RunLog, RunOutcome};

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Job {company_name}/{external_id} already exists")]
    Duplicate {
        company_name: String,
        external_id: String,
    },

    #[error("Job {0} not found")]
    NotFound(Uuid),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn duplicate(job: &NewJob) -> Self {
        Self::Duplicate {
            company_name: job.company_name.clone(),
            external_id: job.external_id.clone(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// All enrichment fields, written together in one update
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentUpdate {
    pub resume_guide: Vec<String>,
    pub prep_questions: Vec<PrepQuestion>,
    pub skills: Vec<String>,
    pub embedding: Vec<f32>,
    pub salary_range: Option<String>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Id of the record holding this identity key, if any
    async fn find_by_identity(&self, company_name: &str, external_id: &str)
        -> StoreResult<Option<Uuid>>;

    /// Insert a record at `processing`. Fails with [`StoreError::Duplicate`] when the
    /// identity key is taken.
    async fn insert_job(&self, job: NewJob) -> StoreResult<JobRecord>;

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<JobRecord>>;

    /// Some other record with this hash and a non-null embedding
    async fn find_enriched_by_hash(&self, hash: &str, exclude: Uuid)
        -> StoreResult<Option<JobRecord>>;

    /// Returns false when the record no longer exists.
    async fn save_enrichment(&self, id: Uuid, update: EnrichmentUpdate) -> StoreResult<bool>;

    /// Copy guide, questions and embedding from `donor` and mark the record active.
    /// Skills and salary are only filled where the target has none.
    async fn clone_enrichment(&self, id: Uuid, donor: &JobRecord) -> StoreResult<bool>;

    async fn set_status(&self, id: Uuid, status: JobStatus) -> StoreResult<bool>;

    /// Ids of records missing guide, questions or embedding, oldest first
    async fn list_missing_enrichment(&self) -> StoreResult<Vec<Uuid>>;

    /// Ids of all active records, oldest first
    async fn list_active(&self) -> StoreResult<Vec<Uuid>>;

    async fn create_run_log(&self, source_name: &str) -> StoreResult<RunLog>;

    /// Applies the terminal update. Logs that are no longer running are left untouched.
    async fn finish_run_log(&self, id: Uuid, outcome: &RunOutcome) -> StoreResult<()>;

    async fn list_run_logs(&self, source_name: Option<&str>, limit: i64) -> StoreResult<Vec<RunLog>>;

    /// Liveness check used by the health endpoint
    async fn ping(&self) -> StoreResult<()>;
}
