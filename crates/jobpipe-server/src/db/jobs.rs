//! Postgres-backed job store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use super::is_unique_violation;
use crate::ingest::store::{EnrichmentUpdate, JobStore, StoreError, StoreResult};
use crate::models::{JobRecord, JobStatus, NewJob, PrepQuestion, RunLog, RunOutcome, RunStatus};

const JOB_COLUMNS: &str = r#"
    id, company_name, external_id, title, description, apply_url, location,
    salary_range, skills, description_hash, resume_guide, prep_questions,
    embedding, status, created_at, updated_at
"#;

const RUN_LOG_COLUMNS: &str = r#"
    id, source_name, status, jobs_found, jobs_new, jobs_skipped, error_count,
    started_at, finished_at, error_message, traceback
"#;

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    company_name: String,
    external_id: String,
    title: String,
    description: String,
    apply_url: String,
    location: Option<String>,
    salary_range: Option<String>,
    skills: Vec<String>,
    description_hash: Option<String>,
    resume_guide: Option<Json<Vec<String>>>,
    prep_questions: Option<Json<Vec<PrepQuestion>>>,
    embedding: Option<Vec<f32>>,
    status: JobStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<JobRow> for JobRecord {
    fn from(row: JobRow) -> Self {
        Self {
            id: row.id,
            company_name: row.company_name,
            external_id: row.external_id,
            title: row.title,
            description: row.description,
            apply_url: row.apply_url,
            location: row.location,
            salary_range: row.salary_range,
            skills: row.skills,
            description_hash: row.description_hash,
            resume_guide: row.resume_guide.map(|Json(guide)| guide),
            prep_questions: row.prep_questions.map(|Json(questions)| questions),
            embedding: row.embedding,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn find_by_identity(
        &self,
        company_name: &str,
        external_id: &str,
    ) -> StoreResult<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM jobs WHERE company_name = $1 AND external_id = $2",
        )
        .bind(company_name)
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<JobRecord> {
        let sql = format!(
            r#"
            INSERT INTO jobs (
                company_name, external_id, title, description, apply_url,
                location, salary_range, skills, description_hash, status
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {JOB_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(&job.company_name)
            .bind(&job.external_id)
            .bind(&job.title)
            .bind(&job.description)
            .bind(&job.apply_url)
            .bind(&job.location)
            .bind(&job.salary_range)
            .bind(&job.skills)
            .bind(&job.description_hash)
            .bind(JobStatus::Processing)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::duplicate(&job)
                } else {
                    StoreError::Database(e)
                }
            })?;

        debug!(job_id = %row.id, external_id = %row.external_id, "Inserted job");
        Ok(row.into())
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<JobRecord>> {
        let sql = format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1");
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(JobRecord::from))
    }

    async fn find_enriched_by_hash(
        &self,
        hash: &str,
        exclude: Uuid,
    ) -> StoreResult<Option<JobRecord>> {
        let sql = format!(
            r#"
            SELECT {JOB_COLUMNS} FROM jobs
            WHERE description_hash = $1 AND id <> $2 AND embedding IS NOT NULL
            ORDER BY created_at
            LIMIT 1
            "#
        );
        let row = sqlx::query_as::<_, JobRow>(&sql)
            .bind(hash)
            .bind(exclude)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(JobRecord::from))
    }

    async fn save_enrichment(&self, id: Uuid, update: EnrichmentUpdate) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET resume_guide = $2, prep_questions = $3, skills = $4,
                embedding = $5, salary_range = $6, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(Json(&update.resume_guide))
        .bind(Json(&update.prep_questions))
        .bind(&update.skills)
        .bind(&update.embedding)
        .bind(&update.salary_range)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clone_enrichment(&self, id: Uuid, donor: &JobRecord) -> StoreResult<bool> {
        // skills and salary only fill gaps on the target
        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET resume_guide = $2, prep_questions = $3, embedding = $4,
                skills = CASE WHEN cardinality(skills) = 0 THEN $5 ELSE skills END,
                salary_range = COALESCE(salary_range, $6),
                status = $7, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(donor.resume_guide.as_ref().map(Json))
        .bind(donor.prep_questions.as_ref().map(Json))
        .bind(&donor.embedding)
        .bind(&donor.skills)
        .bind(&donor.salary_range)
        .bind(JobStatus::Active)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE jobs SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(status)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_missing_enrichment(&self) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT id FROM jobs
            WHERE resume_guide IS NULL OR prep_questions IS NULL OR embedding IS NULL
            ORDER BY created_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn list_active(&self) -> StoreResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM jobs WHERE status = $1 ORDER BY created_at",
        )
        .bind(JobStatus::Active)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn create_run_log(&self, source_name: &str) -> StoreResult<RunLog> {
        let sql = format!(
            "INSERT INTO run_logs (source_name, status) VALUES ($1, $2) RETURNING {RUN_LOG_COLUMNS}"
        );
        let log = sqlx::query_as::<_, RunLog>(&sql)
            .bind(source_name)
            .bind(RunStatus::Running)
            .fetch_one(&self.pool)
            .await?;
        Ok(log)
    }

    async fn finish_run_log(&self, id: Uuid, outcome: &RunOutcome) -> StoreResult<()> {
        // a log leaves `running` exactly once
        sqlx::query(
            r#"
            UPDATE run_logs
            SET status = $2, jobs_found = $3, jobs_new = $4, jobs_skipped = $5,
                error_count = $6, error_message = $7, traceback = $8, finished_at = NOW()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(id)
        .bind(outcome.status)
        .bind(outcome.jobs_found)
        .bind(outcome.jobs_new)
        .bind(outcome.jobs_skipped)
        .bind(outcome.error_count)
        .bind(&outcome.error_message)
        .bind(&outcome.traceback)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_run_logs(
        &self,
        source_name: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<RunLog>> {
        let sql = format!(
            r#"
            SELECT {RUN_LOG_COLUMNS} FROM run_logs
            WHERE ($1::TEXT IS NULL OR source_name = $1)
            ORDER BY started_at DESC
            LIMIT $2
            "#
        );
        let logs = sqlx::query_as::<_, RunLog>(&sql)
            .bind(source_name)
            .bind(limit.max(0))
            .fetch_all(&self.pool)
            .await?;
        Ok(logs)
    }

    async fn ping(&self) -> StoreResult<()> {
        super::health_check(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}
