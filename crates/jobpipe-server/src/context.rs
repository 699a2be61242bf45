//! Process-wide wiring
//!
//! [`AppContext`] owns every long-lived component: stores, AI adapters, the
//! source registry, the ingestion service, the background task queue and the
//! cron scheduler. The HTTP router, the CLI subcommands and the tests all start
//! from one of these.

use anyhow::Result;
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_cron_scheduler::JobScheduler;
use tracing::{info, warn};

use crate::ai::{AiBackend, Embedder, Generator, MockEmbedder, MockGenerator, OpenAiEmbedder, OpenAiGenerator};
use crate::config::{Config, StoreBackend};
use crate::db::{self, PgJobStore, PgLockStore};
use crate::ingest::{
    scheduler, EnrichmentOrchestrator, InMemoryJobStore, InMemoryLockStore, IngestService,
    IngestionOrchestrator, JobStore, LockCoordinator, LockStore, ReconciliationWorker, TaskQueue,
};
use crate::sources::SourceRegistry;

/// The swappable parts of a context
#[derive(Clone)]
pub struct Components {
    pub store: Arc<dyn JobStore>,
    pub locks: Arc<dyn LockStore>,
    pub generator: Arc<dyn Generator>,
    pub embedder: Arc<dyn Embedder>,
    pub sources: SourceRegistry,
}

pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn JobStore>,
    pub enrichment: EnrichmentOrchestrator,
    pub service: Arc<IngestService>,
    pub tasks: TaskQueue,
    pool: Option<PgPool>,
    scheduler: Mutex<Option<JobScheduler>>,
}

impl AppContext {
    /// Build production components from `config`
    pub async fn init(config: Config) -> Result<Arc<Self>> {
        let (pool, store, locks): (Option<PgPool>, Arc<dyn JobStore>, Arc<dyn LockStore>) =
            match config.store {
                StoreBackend::Postgres => {
                    let pool = db::create_pool(&config.database).await?;
                    db::run_migrations(&pool).await?;
                    (
                        Some(pool.clone()),
                        Arc::new(PgJobStore::new(pool.clone())),
                        Arc::new(PgLockStore::new(pool)),
                    )
                },
                StoreBackend::Memory => {
                    warn!("Using in-memory store, nothing will persist across restarts");
                    (
                        None,
                        Arc::new(InMemoryJobStore::new()),
                        Arc::new(InMemoryLockStore::new()),
                    )
                },
            };

        let (generator, embedder): (Arc<dyn Generator>, Arc<dyn Embedder>) =
            match config.ai.backend {
                AiBackend::OpenAi => (
                    Arc::new(OpenAiGenerator::new(config.ai.openai.clone())?),
                    Arc::new(OpenAiEmbedder::new(config.ai.openai.clone())?),
                ),
                AiBackend::Mock => (
                    Arc::new(MockGenerator::new()),
                    Arc::new(MockEmbedder::new(config.ai.openai.dimensions)),
                ),
            };

        let sources = SourceRegistry::standard(config.ingest.max_jobs_per_source)?;
        info!(sources = ?sources.names(), store = ?config.store, ai = ?config.ai.backend, "Components ready");

        let mut context = Self::from_components(
            config,
            Components {
                store,
                locks,
                generator,
                embedder,
                sources,
            },
        );
        context.pool = pool;
        Ok(Arc::new(context))
    }

    /// Wire a context around caller-supplied components. Spawns the task
    /// workers; the cron schedule is left to [`AppContext::start_schedule`].
    pub fn from_components(config: Config, components: Components) -> Self {
        let enrichment = EnrichmentOrchestrator::new(
            components.store.clone(),
            components.generator,
            components.embedder,
        );
        let orchestrator = IngestionOrchestrator::new(components.store.clone(), enrichment.clone());
        let reconciler = ReconciliationWorker::new(
            components.store.clone(),
            enrichment.clone(),
            config.ingest.reconcile.clone(),
        );
        let service = Arc::new(IngestService::new(
            orchestrator,
            reconciler,
            LockCoordinator::new(components.locks),
            components.sources,
            config.ingest.lock_ttl(),
        ));
        let tasks = TaskQueue::start(
            service.clone(),
            config.ingest.task_workers,
            config.ingest.task_queue_capacity,
        );

        Self {
            config,
            store: components.store,
            enrichment,
            service,
            tasks,
            pool: None,
            scheduler: Mutex::new(None),
        }
    }

    /// Install the daily job when `INGEST_SCHEDULE_ENABLED` is set
    pub async fn start_schedule(&self) -> Result<()> {
        if !self.config.ingest.schedule_enabled {
            info!("Ingestion schedule is disabled (INGEST_SCHEDULE_ENABLED=false)");
            return Ok(());
        }

        let scheduler = scheduler::start_scheduler(self.service.clone(), &self.config.ingest.cron).await?;
        *self.scheduler.lock().await = Some(scheduler);
        Ok(())
    }

    /// Stop the schedule, drain queued tasks and close the pool
    pub async fn shutdown(&self) {
        if let Some(mut scheduler) = self.scheduler.lock().await.take() {
            if let Err(e) = scheduler.shutdown().await {
                warn!(error = %e, "Failed to stop scheduler cleanly");
            }
        }

        self.tasks.shutdown().await;

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
        info!("Application context shut down");
    }
}
