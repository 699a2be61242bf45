//! Ingestion pipeline
//!
//! # Architecture
//!
//! - **store**: `JobStore` persistence capability and its errors
//! - **memory**: in-process `JobStore` and `LockStore`
//! - **lock**: named TTL locks with fail-open coordination
//! - **dedup**: identity and description-hash deduplication
//! - **enrichment**: generation plus embedding for one record
//! - **orchestrator**: one source run, start to finish, with its run log
//! - **reconcile**: batched catch-up of records lacking enrichment
//! - **service**: lock-wrapped entry points shared by cron, API and CLI
//! - **tasks**: background queue for triggered runs
//! - **scheduler**: the daily cron job
//! - **config**: `INGEST_*` and `RECONCILE_*` settings
//!
//! # Flow
//!
//! ```text
//! cron / API / CLI
//!     └─► IngestService (lock)
//!             └─► IngestionOrchestrator per source
//!                     ├─► DedupEngine: identity → skip
//!                     ├─► insert (processing)
//!                     ├─► DedupEngine: hash donor → clone
//!                     └─► EnrichmentOrchestrator → active
//!             └─► ReconciliationWorker (missing enrichment)
//! ```

pub mod config;
pub mod dedup;
pub mod enrichment;
pub mod lock;
pub mod memory;
pub mod orchestrator;
pub mod reconcile;
pub mod scheduler;
pub mod service;
pub mod stats;
pub mod store;
pub mod tasks;

pub use config::{IngestConfig, ReconcileConfig};
pub use dedup::{DedupEngine, IdentityDecision};
pub use enrichment::{EnrichError, EnrichOutcome, EnrichmentOrchestrator};
pub use lock::{LockCoordinator, LockStore, DAILY_INGESTION_LOCK};
pub use memory::{InMemoryJobStore, InMemoryLockStore};
pub use orchestrator::IngestionOrchestrator;
pub use reconcile::{ReconcileReport, ReconcileScope, ReconciliationWorker};
pub use service::{IngestService, ScheduledRunReport, SweepReport};
pub use stats::IngestStats;
pub use store::{EnrichmentUpdate, JobStore, StoreError, StoreResult};
pub use tasks::{IngestTask, TaskError, TaskKind, TaskQueue};
