//! Daily ingestion schedule on tokio-cron-scheduler
//!
//! Every replica installs the same job. The daily lock inside
//! [`IngestService::scheduled_run`] makes sure only one of them does the work.

use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::service::IngestService;

/// Install the ingestion job on `cron` and start the scheduler
pub async fn start_scheduler(service: Arc<IngestService>, cron: &str) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let service = service.clone();
        Box::pin(async move {
            tracing::info!("Running scheduled ingestion");
            if service.scheduled_run().await.is_none() {
                tracing::info!("Scheduled ingestion skipped, another worker holds the lock");
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    tracing::info!(cron = %cron, "Ingestion schedule started");
    Ok(scheduler)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::config::DEFAULT_INGEST_CRON;

    #[tokio::test]
    async fn test_default_cron_is_accepted() {
        let job = Job::new_async(DEFAULT_INGEST_CRON, |_uuid, _lock| Box::pin(async {}));
        assert!(job.is_ok());
    }
}
