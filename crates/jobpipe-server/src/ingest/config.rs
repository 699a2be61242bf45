//! Ingestion configuration
//!
//! Scheduling, locking, reconciliation pacing and the background task pool.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Daily at 16:30 UTC (22:00 IST). Six fields: sec min hour day month weekday.
pub const DEFAULT_INGEST_CRON: &str = "0 30 16 * * *";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileConfig {
    /// Records per batch (default: 3)
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Pause between batches in seconds (default: 3)
    #[serde(default = "default_batch_pause")]
    pub batch_pause_secs: u64,
    /// Records enriched at once inside a batch (default: 5)
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_batch_size() -> usize {
    3
}

fn default_batch_pause() -> u64 {
    3
}

fn default_concurrency() -> usize {
    5
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            batch_pause_secs: default_batch_pause(),
            concurrency: default_concurrency(),
        }
    }
}

impl ReconcileConfig {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_secs(self.batch_pause_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Whether the cron schedule is installed at startup
    pub schedule_enabled: bool,
    pub cron: String,
    /// Distributed lock TTL in seconds (default: 1800)
    pub lock_ttl_secs: u64,
    /// Postings kept per source per run
    pub max_jobs_per_source: usize,
    /// Upper bound for on-demand enrichment through the API
    pub enrich_timeout_secs: u64,
    /// Background workers consuming triggered tasks
    pub task_workers: usize,
    pub task_queue_capacity: usize,
    pub reconcile: ReconcileConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            schedule_enabled: true,
            cron: DEFAULT_INGEST_CRON.to_string(),
            lock_ttl_secs: 30 * 60,
            max_jobs_per_source: 7,
            enrich_timeout_secs: 60,
            task_workers: 2,
            task_queue_capacity: 32,
            reconcile: ReconcileConfig::default(),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl IngestConfig {
    /// Load from `INGEST_*`, `RECONCILE_*`, `ENRICH_TIMEOUT_SECS` and `TASK_*` variables
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            schedule_enabled: env_or("INGEST_SCHEDULE_ENABLED", defaults.schedule_enabled),
            cron: std::env::var("INGEST_CRON").unwrap_or(defaults.cron),
            lock_ttl_secs: env_or("INGEST_LOCK_TTL_SECS", defaults.lock_ttl_secs),
            max_jobs_per_source: env_or("INGEST_MAX_JOBS_PER_SOURCE", defaults.max_jobs_per_source),
            enrich_timeout_secs: env_or("ENRICH_TIMEOUT_SECS", defaults.enrich_timeout_secs),
            task_workers: env_or("TASK_WORKERS", defaults.task_workers),
            task_queue_capacity: env_or("TASK_QUEUE_CAPACITY", defaults.task_queue_capacity),
            reconcile: ReconcileConfig {
                batch_size: env_or("RECONCILE_BATCH_SIZE", defaults.reconcile.batch_size),
                batch_pause_secs: env_or(
                    "RECONCILE_BATCH_PAUSE_SECS",
                    defaults.reconcile.batch_pause_secs,
                ),
                concurrency: env_or("RECONCILE_CONCURRENCY", defaults.reconcile.concurrency),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.lock_ttl_secs == 0 {
            anyhow::bail!("INGEST_LOCK_TTL_SECS must be greater than 0");
        }
        if self.max_jobs_per_source == 0 {
            anyhow::bail!("INGEST_MAX_JOBS_PER_SOURCE must be greater than 0");
        }
        if self.reconcile.batch_size == 0 || self.reconcile.concurrency == 0 {
            anyhow::bail!("Reconciliation batch size and concurrency must be greater than 0");
        }
        if self.task_workers == 0 || self.task_queue_capacity == 0 {
            anyhow::bail!("TASK_WORKERS and TASK_QUEUE_CAPACITY must be greater than 0");
        }
        if self.cron.split_whitespace().count() != 6 {
            anyhow::bail!("INGEST_CRON must have six fields (sec min hour day month weekday): {}", self.cron);
        }
        Ok(())
    }

    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl_secs)
    }

    pub fn enrich_timeout(&self) -> Duration {
        Duration::from_secs(self.enrich_timeout_secs)
    }
}
