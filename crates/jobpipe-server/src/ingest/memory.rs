//! In-process stores
//!
//! Used when `JOBPIPE_STORE=memory` and throughout the tests. They follow the
//! same contracts as the Postgres stores, including the identity uniqueness
//! constraint and the conditional lock write.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::lock::LockStore;
use super::store::{EnrichmentUpdate, JobStore, StoreError, StoreResult};
use crate::models::{JobRecord, JobStatus, NewJob, RunLog, RunOutcome, RunStatus};

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

fn system_clock() -> Clock {
    Arc::new(Utc::now)
}

#[derive(Default)]
struct JobTables {
    jobs: HashMap<Uuid, JobRecord>,
    identities: HashMap<(String, String), Uuid>,
    // insertion order, for oldest-first listings
    order: Vec<Uuid>,
    runs: Vec<RunLog>,
}

#[derive(Default)]
pub struct InMemoryJobStore {
    tables: Mutex<JobTables>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed record, bypassing the pipeline. Test seeding only.
    pub async fn seed(&self, record: JobRecord) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let key = (record.company_name.clone(), record.external_id.clone());
        if tables.identities.contains_key(&key) {
            return Err(StoreError::Duplicate {
                company_name: key.0,
                external_id: key.1,
            });
        }
        tables.identities.insert(key, record.id);
        tables.order.push(record.id);
        tables.jobs.insert(record.id, record);
        Ok(())
    }

    /// Remove a record, as an operator would. Test helper.
    pub async fn delete(&self, id: Uuid) -> bool {
        let mut tables = self.tables.lock().await;
        match tables.jobs.remove(&id) {
            Some(record) => {
                tables
                    .identities
                    .remove(&(record.company_name, record.external_id));
                tables.order.retain(|existing| *existing != id);
                true
            },
            None => false,
        }
    }

    pub async fn all_jobs(&self) -> Vec<JobRecord> {
        let tables = self.tables.lock().await;
        tables
            .order
            .iter()
            .filter_map(|id| tables.jobs.get(id).cloned())
            .collect()
    }

    fn ids_where(tables: &JobTables, pred: impl Fn(&JobRecord) -> bool) -> Vec<Uuid> {
        tables
            .order
            .iter()
            .filter(|id| tables.jobs.get(*id).is_some_and(&pred))
            .copied()
            .collect()
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn find_by_identity(
        &self,
        company_name: &str,
        external_id: &str,
    ) -> StoreResult<Option<Uuid>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .identities
            .get(&(company_name.to_string(), external_id.to_string()))
            .copied())
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<JobRecord> {
        let mut tables = self.tables.lock().await;
        let key = (job.company_name.clone(), job.external_id.clone());
        if tables.identities.contains_key(&key) {
            return Err(StoreError::duplicate(&job));
        }

        let now = Utc::now();
        let record = JobRecord {
            id: Uuid::new_v4(),
            company_name: job.company_name,
            external_id: job.external_id,
            title: job.title,
            description: job.description,
            apply_url: job.apply_url,
            location: job.location,
            salary_range: job.salary_range,
            skills: job.skills,
            description_hash: job.description_hash,
            resume_guide: None,
            prep_questions: None,
            embedding: None,
            status: JobStatus::Processing,
            created_at: now,
            updated_at: now,
        };

        tables.identities.insert(key, record.id);
        tables.order.push(record.id);
        tables.jobs.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<JobRecord>> {
        Ok(self.tables.lock().await.jobs.get(&id).cloned())
    }

    async fn find_enriched_by_hash(
        &self,
        hash: &str,
        exclude: Uuid,
    ) -> StoreResult<Option<JobRecord>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .order
            .iter()
            .filter_map(|id| tables.jobs.get(id))
            .find(|job| {
                job.id != exclude
                    && job.embedding.is_some()
                    && job.description_hash.as_deref() == Some(hash)
            })
            .cloned())
    }

    async fn save_enrichment(&self, id: Uuid, update: EnrichmentUpdate) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(job) = tables.jobs.get_mut(&id) else {
            return Ok(false);
        };

        job.resume_guide = Some(update.resume_guide);
        job.prep_questions = Some(update.prep_questions);
        job.skills = update.skills;
        job.embedding = Some(update.embedding);
        job.salary_range = update.salary_range;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn clone_enrichment(&self, id: Uuid, donor: &JobRecord) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        let Some(job) = tables.jobs.get_mut(&id) else {
            return Ok(false);
        };

        job.resume_guide = donor.resume_guide.clone();
        job.prep_questions = donor.prep_questions.clone();
        job.embedding = donor.embedding.clone();
        if job.skills.is_empty() {
            job.skills = donor.skills.clone();
        }
        if job.salary_range.is_none() {
            job.salary_range = donor.salary_range.clone();
        }
        job.status = JobStatus::Active;
        job.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.jobs.get_mut(&id) {
            Some(job) => {
                job.status = status;
                job.updated_at = Utc::now();
                Ok(true)
            },
            None => Ok(false),
        }
    }

    async fn list_missing_enrichment(&self) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.lock().await;
        Ok(Self::ids_where(&tables, JobRecord::missing_enrichment))
    }

    async fn list_active(&self) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.lock().await;
        Ok(Self::ids_where(&tables, |job| job.status == JobStatus::Active))
    }

    async fn create_run_log(&self, source_name: &str) -> StoreResult<RunLog> {
        let log = RunLog {
            id: Uuid::new_v4(),
            source_name: source_name.to_string(),
            status: RunStatus::Running,
            jobs_found: 0,
            jobs_new: 0,
            jobs_skipped: 0,
            error_count: 0,
            started_at: Utc::now(),
            finished_at: None,
            error_message: None,
            traceback: None,
        };
        self.tables.lock().await.runs.push(log.clone());
        Ok(log)
    }

    async fn finish_run_log(&self, id: Uuid, outcome: &RunOutcome) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if let Some(log) = tables
            .runs
            .iter_mut()
            .find(|log| log.id == id && log.status == RunStatus::Running)
        {
            log.status = outcome.status;
            log.jobs_found = outcome.jobs_found;
            log.jobs_new = outcome.jobs_new;
            log.jobs_skipped = outcome.jobs_skipped;
            log.error_count = outcome.error_count;
            log.error_message = outcome.error_message.clone();
            log.traceback = outcome.traceback.clone();
            log.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn list_run_logs(
        &self,
        source_name: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<RunLog>> {
        let tables = self.tables.lock().await;
        let limit = usize::try_from(limit.max(0)).unwrap_or(usize::MAX);
        Ok(tables
            .runs
            .iter()
            .rev()
            .filter(|log| source_name.map_or(true, |name| log.source_name == name))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}

struct LockRow {
    locked_until: DateTime<Utc>,
    locked_by: String,
}

/// Lock table kept in process memory, with an injectable clock
pub struct InMemoryLockStore {
    locks: Mutex<HashMap<String, LockRow>>,
    clock: Clock,
}

impl Default for InMemoryLockStore {
    fn default() -> Self {
        Self::with_clock(system_clock())
    }
}

impl InMemoryLockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: Clock) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            clock,
        }
    }

    pub async fn holder(&self, name: &str) -> Option<String> {
        let now = (self.clock)();
        self.locks
            .lock()
            .await
            .get(name)
            .filter(|row| row.locked_until >= now)
            .map(|row| row.locked_by.clone())
    }
}

#[async_trait]
impl LockStore for InMemoryLockStore {
    async fn try_acquire(&self, name: &str, ttl: Duration, holder: &str) -> StoreResult<bool> {
        let now = (self.clock)();
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| StoreError::Unavailable(format!("invalid lock ttl: {}", e)))?;

        let mut locks = self.locks.lock().await;
        if locks.get(name).is_some_and(|row| row.locked_until >= now) {
            return Ok(false);
        }

        locks.insert(
            name.to_string(),
            LockRow {
                locked_until: now + ttl,
                locked_by: holder.to_string(),
            },
        );
        Ok(true)
    }

    async fn release(&self, name: &str) -> StoreResult<()> {
        if let Some(row) = self.locks.lock().await.get_mut(name) {
            row.locked_until = released_at();
        }
        Ok(())
    }
}

/// The "already expired" instant written on release
pub fn released_at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
