//! Postgres store tests
//!
//! Require Docker:
//!
//! ```bash
//! cargo test -p jobpipe-server --test pg_store_test -- --ignored --nocapture
//! ```

mod common;

use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;

use common::{init_test_tracing, TestPostgres};
use jobpipe_server::db::{PgJobStore, PgLockStore};
use jobpipe_server::ingest::{
    EnrichmentOrchestrator, EnrichmentUpdate, IngestionOrchestrator, JobStore, LockStore,
};
use jobpipe_server::ai::{MockEmbedder, MockGenerator};
use jobpipe_server::models::{JobStatus, NewJob, PrepQuestion, RunOutcome, RunStatus};
use jobpipe_server::testing::{posting, StaticSource, TEST_EMBEDDING_DIMENSIONS};

fn update(skills: Vec<&str>) -> EnrichmentUpdate {
    EnrichmentUpdate {
        resume_guide: vec!["Lead with audit exposure".into(); 5],
        prep_questions: (0..5)
            .map(|i| PrepQuestion {
                question: format!("Question {i}"),
                answer_strategy: format!("Answer {i}"),
            })
            .collect(),
        skills: skills.into_iter().map(String::from).collect(),
        embedding: vec![0.25; TEST_EMBEDDING_DIMENSIONS],
        salary_range: Some("6-9 LPA".into()),
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_identity_is_unique() -> anyhow::Result<()> {
    init_test_tracing();
    let pg = TestPostgres::start().await?;
    let store = PgJobStore::new(pg.pool_clone());

    let job = NewJob::from(&posting("KPMG", "K-1", "Audit associate"));
    let record = store.insert_job(job.clone()).await?;
    assert_eq!(record.status, JobStatus::Processing);
    assert_eq!(store.find_by_identity("KPMG", "K-1").await?, Some(record.id));

    let err = store.insert_job(job).await.unwrap_err();
    assert!(err.is_duplicate());

    // same external id at another company is a different identity
    store
        .insert_job(NewJob::from(&posting("EY", "K-1", "Audit associate")))
        .await?;
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_enrichment_roundtrip_and_clone() -> anyhow::Result<()> {
    let pg = TestPostgres::start().await?;
    let store = PgJobStore::new(pg.pool_clone());

    let donor = store
        .insert_job(NewJob::from(&posting("KPMG", "K-1", "Shared description")))
        .await?;
    assert!(store.save_enrichment(donor.id, update(vec!["ifrs"])).await?);

    let donor = store.get_job(donor.id).await?.unwrap();
    assert!(donor.is_enriched());
    assert_eq!(donor.status, JobStatus::Processing);
    assert_eq!(donor.prep_questions.as_ref().map(Vec::len), Some(5));

    let mut twin_posting = posting("KPMG", "K-2", "Shared description");
    twin_posting.skills = vec!["sql".into()];
    let twin = store.insert_job(NewJob::from(&twin_posting)).await?;

    let found = store
        .find_enriched_by_hash(twin.description_hash.as_deref().unwrap(), twin.id)
        .await?
        .unwrap();
    assert_eq!(found.id, donor.id);

    assert!(store.clone_enrichment(twin.id, &found).await?);
    let twin = store.get_job(twin.id).await?.unwrap();
    assert_eq!(twin.status, JobStatus::Active);
    assert_eq!(twin.embedding, donor.embedding);
    assert_eq!(twin.skills, vec!["sql".to_string()]);
    assert_eq!(twin.salary_range.as_deref(), Some("6-9 LPA"));

    assert_eq!(store.list_missing_enrichment().await?, Vec::<uuid::Uuid>::new());
    assert_eq!(store.list_active().await?, vec![twin.id]);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_run_log_finishes_once() -> anyhow::Result<()> {
    let pg = TestPostgres::start().await?;
    let store = PgJobStore::new(pg.pool_clone());

    let log = store.create_run_log("pwc").await?;
    assert_eq!(log.status, RunStatus::Running);

    let outcome = RunOutcome {
        status: RunStatus::Partial,
        jobs_found: 4,
        jobs_new: 3,
        jobs_skipped: 0,
        error_count: 1,
        error_message: None,
        traceback: None,
    };
    store.finish_run_log(log.id, &outcome).await?;
    store
        .finish_run_log(
            log.id,
            &RunOutcome {
                status: RunStatus::Success,
                ..outcome.clone()
            },
        )
        .await?;

    let runs = store.list_run_logs(Some("pwc"), 5).await?;
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Partial);
    assert_eq!(runs[0].error_count, 1);
    assert!(runs[0].finished_at.is_some());
    assert!(store.list_run_logs(Some("ey"), 5).await?.is_empty());
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_lock_single_winner_and_release() -> anyhow::Result<()> {
    let pg = TestPostgres::start().await?;
    let store = Arc::new(PgLockStore::new(pg.pool_clone()));
    let ttl = Duration::from_secs(1800);

    let attempts = (0..8).map(|i| {
        let store = store.clone();
        async move { store.try_acquire("daily_ingestion", ttl, &format!("host:{i}")).await }
    });
    let results = futures::future::join_all(attempts).await;
    let winners = results
        .into_iter()
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);

    store.release("daily_ingestion").await?;
    assert!(store.try_acquire("daily_ingestion", ttl, "host:99").await?);

    // an expired lock can be taken over
    assert!(store.try_acquire("short", Duration::from_secs(1), "host:1").await?);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert!(store.try_acquire("short", ttl, "host:2").await?);
    Ok(())
}

#[tokio::test]
#[ignore = "requires Docker"]
#[serial]
async fn test_pipeline_against_postgres() -> anyhow::Result<()> {
    let pg = TestPostgres::start().await?;
    let store: Arc<dyn JobStore> = Arc::new(PgJobStore::new(pg.pool_clone()));
    let generator = Arc::new(MockGenerator::new());
    let enrichment = EnrichmentOrchestrator::new(
        store.clone(),
        generator.clone(),
        Arc::new(MockEmbedder::new(TEST_EMBEDDING_DIMENSIONS)),
    );
    let orchestrator = IngestionOrchestrator::new(store.clone(), enrichment);
    let source = StaticSource::new(
        "pwc",
        vec![
            posting("PwC", "R-1", "Same text"),
            posting("PwC", "R-2", "Same text"),
            posting("PwC", "R-3", "Other text"),
        ],
    );

    let first = orchestrator.run(&source).await;
    assert_eq!((first.new, first.dedup_hits, first.errors), (3, 1, 0));
    assert_eq!(generator.calls(), 2);

    let second = orchestrator.run(&source).await;
    assert_eq!((second.new, second.skipped), (0, 3));

    let runs = store.list_run_logs(Some("pwc"), 5).await?;
    assert_eq!(runs.len(), 2);
    assert!(runs.iter().all(|run| run.status == RunStatus::Success));
    Ok(())
}
