//! Test doubles and fixtures
//!
//! Shared by the unit tests and the `tests/` integration suites: in-process
//! sources, failure-injecting generators and stores, a manual clock for lock
//! expiry, and a [`Harness`] that wires everything around in-memory stores and
//! the mock AI adapters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

use crate::ai::{Embedder, GenerationRequest, Generator, MockEmbedder, MockGenerator};
use crate::config::Config;
use crate::context::{AppContext, Components};
use crate::ingest::memory::{Clock, InMemoryJobStore, InMemoryLockStore};
use crate::ingest::store::{EnrichmentUpdate, JobStore, StoreError, StoreResult};
use crate::ingest::{EnrichmentOrchestrator, IngestionOrchestrator};
use crate::models::{Enrichment, JobRecord, JobStatus, NewJob, RawPosting, RunLog, RunOutcome};
use crate::sources::{JobSource, SourceRegistry};

pub const TEST_EMBEDDING_DIMENSIONS: usize = 8;

/// Posting with an apply URL derived from its id
pub fn posting(company: &str, external_id: &str, description: &str) -> RawPosting {
    RawPosting {
        external_id: external_id.to_string(),
        title: format!("Associate {}", external_id),
        description: description.to_string(),
        company_name: company.to_string(),
        apply_url: format!("https://careers.example.com/{}/{}", company.to_lowercase(), external_id),
        skills: vec![],
        location: Some("Bengaluru".to_string()),
        salary: None,
    }
}

/// Source returning a fixed batch on every fetch
pub struct StaticSource {
    name: String,
    postings: Vec<RawPosting>,
    fetches: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: impl Into<String>, postings: Vec<RawPosting>) -> Self {
        Self {
            name: name.into(),
            postings,
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn company(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<RawPosting>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.postings.clone())
    }
}

/// Source whose fetch always fails
pub struct FailingSource {
    name: String,
    message: String,
}

impl FailingSource {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }
}

#[async_trait]
impl JobSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn company(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> anyhow::Result<Vec<RawPosting>> {
        Err(anyhow::anyhow!("{}", self.message))
    }
}

/// Generator that fails for descriptions containing a marker and delegates
/// to [`MockGenerator`] otherwise
#[derive(Default)]
pub struct FailingGenerator {
    marker: Option<String>,
    inner: MockGenerator,
    failures: AtomicUsize,
}

impl FailingGenerator {
    /// Fails every call
    pub fn always() -> Self {
        Self::default()
    }

    /// Fails calls whose description contains `marker`
    pub fn when_description_contains(marker: impl Into<String>) -> Self {
        Self {
            marker: Some(marker.into()),
            ..Self::default()
        }
    }

    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for FailingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Enrichment> {
        let fail = self
            .marker
            .as_deref()
            .map_or(true, |marker| request.description.contains(marker));
        if fail {
            self.failures.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("model overloaded");
        }
        self.inner.generate(request).await
    }
}

/// Generator that sleeps before answering
pub struct SlowGenerator {
    delay: Duration,
    inner: MockGenerator,
}

impl SlowGenerator {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: MockGenerator::new(),
        }
    }
}

#[async_trait]
impl Generator for SlowGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<Enrichment> {
        tokio::time::sleep(self.delay).await;
        self.inner.generate(request).await
    }
}

/// Point at which a [`FlakyStore`] deletes its vanishing records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VanishAt {
    /// Right after a candidate listing returned them
    AfterListing,
    /// Just before a donor's enrichment is cloned onto them
    BeforeClone,
    /// Just after their enrichment is saved
    AfterSave,
}

/// [`InMemoryJobStore`] whose inserts fail for chosen external ids, or whose
/// records disappear at a chosen point
pub struct FlakyStore {
    inner: InMemoryJobStore,
    failing_ids: HashSet<String>,
    vanishing_ids: HashSet<String>,
    vanish_at: Option<VanishAt>,
}

impl FlakyStore {
    pub fn failing_inserts<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: InMemoryJobStore::new(),
            failing_ids: ids.into_iter().map(Into::into).collect(),
            vanishing_ids: HashSet::new(),
            vanish_at: None,
        }
    }

    pub fn vanishing<I, S>(ids: I, at: VanishAt) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: InMemoryJobStore::new(),
            failing_ids: HashSet::new(),
            vanishing_ids: ids.into_iter().map(Into::into).collect(),
            vanish_at: Some(at),
        }
    }

    pub fn inner(&self) -> &InMemoryJobStore {
        &self.inner
    }

    async fn vanish_if_marked(&self, at: VanishAt, id: Uuid) {
        if self.vanish_at != Some(at) {
            return;
        }
        if let Ok(Some(job)) = self.inner.get_job(id).await {
            if self.vanishing_ids.contains(&job.external_id) {
                self.inner.delete(id).await;
            }
        }
    }

    async fn vanish_listed(&self, ids: StoreResult<Vec<Uuid>>) -> StoreResult<Vec<Uuid>> {
        let ids = ids?;
        for id in &ids {
            self.vanish_if_marked(VanishAt::AfterListing, *id).await;
        }
        Ok(ids)
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn find_by_identity(
        &self,
        company_name: &str,
        external_id: &str,
    ) -> StoreResult<Option<Uuid>> {
        self.inner.find_by_identity(company_name, external_id).await
    }

    async fn insert_job(&self, job: NewJob) -> StoreResult<JobRecord> {
        if self.failing_ids.contains(&job.external_id) {
            return Err(StoreError::Unavailable("connection reset by peer".to_string()));
        }
        self.inner.insert_job(job).await
    }

    async fn get_job(&self, id: Uuid) -> StoreResult<Option<JobRecord>> {
        self.inner.get_job(id).await
    }

    async fn find_enriched_by_hash(
        &self,
        hash: &str,
        exclude: Uuid,
    ) -> StoreResult<Option<JobRecord>> {
        self.inner.find_enriched_by_hash(hash, exclude).await
    }

    async fn save_enrichment(&self, id: Uuid, update: EnrichmentUpdate) -> StoreResult<bool> {
        let saved = self.inner.save_enrichment(id, update).await?;
        self.vanish_if_marked(VanishAt::AfterSave, id).await;
        Ok(saved)
    }

    async fn clone_enrichment(&self, id: Uuid, donor: &JobRecord) -> StoreResult<bool> {
        self.vanish_if_marked(VanishAt::BeforeClone, id).await;
        self.inner.clone_enrichment(id, donor).await
    }

    async fn set_status(&self, id: Uuid, status: JobStatus) -> StoreResult<bool> {
        self.inner.set_status(id, status).await
    }

    async fn list_missing_enrichment(&self) -> StoreResult<Vec<Uuid>> {
        self.vanish_listed(self.inner.list_missing_enrichment().await).await
    }

    async fn list_active(&self) -> StoreResult<Vec<Uuid>> {
        self.vanish_listed(self.inner.list_active().await).await
    }

    async fn create_run_log(&self, source_name: &str) -> StoreResult<RunLog> {
        self.inner.create_run_log(source_name).await
    }

    async fn finish_run_log(&self, id: Uuid, outcome: &RunOutcome) -> StoreResult<()> {
        self.inner.finish_run_log(id, outcome).await
    }

    async fn list_run_logs(
        &self,
        source_name: Option<&str>,
        limit: i64,
    ) -> StoreResult<Vec<RunLog>> {
        self.inner.list_run_logs(source_name, limit).await
    }

    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }
}

/// Clock that only moves when told to
#[derive(Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn advance(&self, by: Duration) {
        let by = chrono::Duration::from_std(by).unwrap_or(chrono::Duration::zero());
        match self.now.lock() {
            Ok(mut guard) => *guard += by,
            Err(poisoned) => *poisoned.into_inner() += by,
        }
    }

    pub fn clock(&self) -> Clock {
        let this = self.clone();
        Arc::new(move || this.now())
    }
}

/// In-memory stores plus mock AI, with handles kept for assertions
pub struct Harness {
    pub store: Arc<InMemoryJobStore>,
    pub locks: Arc<InMemoryLockStore>,
    pub generator: Arc<MockGenerator>,
    pub embedder: Arc<MockEmbedder>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryJobStore::new()),
            locks: Arc::new(InMemoryLockStore::new()),
            generator: Arc::new(MockGenerator::new()),
            embedder: Arc::new(MockEmbedder::new(TEST_EMBEDDING_DIMENSIONS)),
        }
    }

    pub fn enrichment(&self) -> EnrichmentOrchestrator {
        self.enrichment_with(self.generator.clone())
    }

    pub fn enrichment_with(&self, generator: Arc<dyn Generator>) -> EnrichmentOrchestrator {
        EnrichmentOrchestrator::new(
            self.store.clone(),
            generator,
            self.embedder.clone() as Arc<dyn Embedder>,
        )
    }

    pub fn orchestrator(&self) -> IngestionOrchestrator {
        IngestionOrchestrator::new(self.store.clone(), self.enrichment())
    }

    pub fn components(&self, sources: SourceRegistry) -> Components {
        Components {
            store: self.store.clone(),
            locks: self.locks.clone(),
            generator: self.generator.clone(),
            embedder: self.embedder.clone(),
            sources,
        }
    }

    /// A context on offline config with no reconciliation pause
    pub fn context(&self, sources: SourceRegistry) -> Arc<AppContext> {
        Arc::new(AppContext::from_components(test_config(), self.components(sources)))
    }
}

/// Offline config with pacing removed
pub fn test_config() -> Config {
    let mut config = Config::offline();
    config.ai.openai.dimensions = TEST_EMBEDDING_DIMENSIONS;
    config.ingest.reconcile.batch_pause_secs = 0;
    config
}
