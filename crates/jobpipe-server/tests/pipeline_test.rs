//! Ingestion pipeline tests
//!
//! Run against the in-memory store and the deterministic AI mocks, so they need
//! no network or database.

mod common;

use std::sync::Arc;

use common::init_test_tracing;
use jobpipe_server::ai::{MockEmbedder, MockGenerator};
use jobpipe_server::ingest::{
    EnrichmentOrchestrator, IngestionOrchestrator, JobStore, LockStore, DAILY_INGESTION_LOCK,
};
use jobpipe_server::models::{JobStatus, NewJob, RawPosting, RunStatus};
use jobpipe_server::sources::{SourceError, SourceRegistry, SourceSelector};
use jobpipe_server::testing::{
    posting, FailingGenerator, FailingSource, FlakyStore, Harness, StaticSource, VanishAt,
    TEST_EMBEDDING_DIMENSIONS,
};

const SHARED_DESCRIPTION: &str = "Statutory audit engagements for listed manufacturing clients";

fn pwc(external_id: &str, description: &str) -> RawPosting {
    posting("PwC", external_id, description)
}

fn unique(external_id: &str) -> RawPosting {
    pwc(external_id, &format!("Role {} in the assurance practice", external_id))
}

#[tokio::test]
async fn test_mixed_batch_counts_and_generation_calls() {
    init_test_tracing();
    let harness = Harness::new();

    // three identities already stored from an earlier run
    for id in ["R-1", "R-2", "R-3"] {
        harness.store.insert_job(NewJob::from(&unique(id))).await.unwrap();
    }

    // an enriched record whose description two of the new postings repeat
    let donor = harness
        .store
        .insert_job(NewJob::from(&pwc("R-0", SHARED_DESCRIPTION)))
        .await
        .unwrap();
    harness.enrichment().enrich(donor.id).await;
    let calls_before = harness.generator.calls();

    let mut batch: Vec<RawPosting> = ["R-1", "R-2", "R-3"].into_iter().map(unique).collect();
    batch.push(pwc("R-4", SHARED_DESCRIPTION));
    batch.push(pwc("R-5", SHARED_DESCRIPTION));
    batch.extend(["R-6", "R-7", "R-8", "R-9", "R-10"].into_iter().map(unique));
    let source = StaticSource::new("pwc", batch);

    let stats = harness.orchestrator().run(&source).await;

    assert_eq!(stats.fetched, 10);
    assert_eq!(stats.new, 7);
    assert_eq!(stats.skipped, 3);
    assert_eq!(stats.errors, 0);
    assert_eq!(stats.dedup_hits, 2);
    assert!(stats.is_partition());
    assert_eq!(harness.generator.calls() - calls_before, 5);

    let donor = harness.store.get_job(donor.id).await.unwrap().unwrap();
    for id in ["R-4", "R-5"] {
        let job_id = harness.store.find_by_identity("PwC", id).await.unwrap().unwrap();
        let job = harness.store.get_job(job_id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Active);
        assert_eq!(job.embedding, donor.embedding);
        assert_eq!(job.resume_guide, donor.resume_guide);
    }

    let runs = harness.store.list_run_logs(Some("pwc"), 10).await.unwrap();
    assert_eq!(runs.len(), 1);
    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Success);
    assert_eq!((run.jobs_found, run.jobs_new, run.jobs_skipped, run.error_count), (10, 7, 3, 0));
    assert!(run.finished_at.is_some());
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let harness = Harness::new();
    let source = StaticSource::new("pwc", (1..=4).map(|i| unique(&format!("R-{i}"))).collect());
    let orchestrator = harness.orchestrator();

    let first = orchestrator.run(&source).await;
    assert_eq!(first.new, 4);
    let calls = harness.generator.calls();

    let second = orchestrator.run(&source).await;
    assert_eq!(second.fetched, 4);
    assert_eq!(second.new, 0);
    assert_eq!(second.skipped, 4);
    assert_eq!(second.status(), RunStatus::Success);
    assert_eq!(harness.generator.calls(), calls);
    assert_eq!(harness.store.all_jobs().await.len(), 4);
}

#[tokio::test]
async fn test_identical_descriptions_in_one_batch_generate_once() {
    let harness = Harness::new();
    let source = StaticSource::new(
        "pwc",
        vec![pwc("R-1", SHARED_DESCRIPTION), pwc("R-2", SHARED_DESCRIPTION)],
    );

    let stats = harness.orchestrator().run(&source).await;

    assert_eq!(stats.new, 2);
    assert_eq!(stats.dedup_hits, 1);
    assert_eq!(harness.generator.calls(), 1);
    assert_eq!(harness.embedder.calls(), 1);
}

#[tokio::test]
async fn test_empty_descriptions_never_share_enrichment() {
    let harness = Harness::new();
    let source = StaticSource::new("ey", vec![posting("EY", "E-1", ""), posting("EY", "E-2", "")]);

    let stats = harness.orchestrator().run(&source).await;

    assert_eq!(stats.new, 2);
    assert_eq!(stats.dedup_hits, 0);
    assert_eq!(harness.generator.calls(), 2);
    assert!(harness
        .store
        .all_jobs()
        .await
        .iter()
        .all(|job| job.description_hash.is_none()));
}

#[tokio::test]
async fn test_fetch_failure_marks_run_failed() {
    let harness = Harness::new();
    let source = FailingSource::new("kpmg", "HTTP 503 from requisition search");

    let stats = harness.orchestrator().run(&source).await;

    assert_eq!(stats.status(), RunStatus::Failed);
    assert_eq!(stats.fetched, 0);
    assert!(stats.fetch_error.as_deref().unwrap().contains("HTTP 503"));
    assert!(harness.store.all_jobs().await.is_empty());

    let runs = harness.store.list_run_logs(Some("kpmg"), 10).await.unwrap();
    let run = &runs[0];
    assert_eq!(run.status, RunStatus::Failed);
    assert_eq!(run.error_count, 0);
    let message = run.error_message.as_deref().unwrap();
    assert!(message.starts_with("Failed to fetch kpmg postings"));
    assert!(message.contains("HTTP 503 from requisition search"));
    assert!(run.traceback.as_deref().unwrap().contains("HTTP 503"));
}

fn flaky_orchestrator(store: Arc<FlakyStore>) -> IngestionOrchestrator {
    let enrichment = EnrichmentOrchestrator::new(
        store.clone(),
        Arc::new(MockGenerator::new()),
        Arc::new(MockEmbedder::new(TEST_EMBEDDING_DIMENSIONS)),
    );
    IngestionOrchestrator::new(store, enrichment)
}

#[tokio::test]
async fn test_record_failure_is_isolated() {
    let store = Arc::new(FlakyStore::failing_inserts(["R-3"]));
    let source = StaticSource::new("pwc", (1..=4).map(|i| unique(&format!("R-{i}"))).collect());

    let stats = flaky_orchestrator(store.clone()).run(&source).await;

    assert_eq!(stats.new, 3);
    assert_eq!(stats.errors, 1);
    assert!(stats.is_partition());
    assert_eq!(stats.status(), RunStatus::Partial);

    let runs = store.inner().list_run_logs(None, 10).await.unwrap();
    assert_eq!(runs[0].status, RunStatus::Partial);
    assert_eq!(runs[0].error_count, 1);
}

#[tokio::test]
async fn test_all_records_failing_marks_run_failed() {
    let store = Arc::new(FlakyStore::failing_inserts(["R-1", "R-2"]));
    let source = StaticSource::new("pwc", vec![unique("R-1"), unique("R-2")]);

    let stats = flaky_orchestrator(store).run(&source).await;

    assert_eq!(stats.errors, 2);
    assert_eq!(stats.new, 0);
    assert_eq!(stats.status(), RunStatus::Failed);
}

#[tokio::test]
async fn test_record_deleted_before_clone_counts_skipped() {
    let store = Arc::new(FlakyStore::vanishing(["R-2"], VanishAt::BeforeClone));
    let source = StaticSource::new(
        "pwc",
        vec![pwc("R-1", SHARED_DESCRIPTION), pwc("R-2", SHARED_DESCRIPTION)],
    );

    let stats = flaky_orchestrator(store.clone()).run(&source).await;

    assert_eq!(stats.new, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.dedup_hits, 0);
    assert_eq!(stats.errors, 0);
    assert!(stats.is_partition());
    assert!(store.inner().find_by_identity("PwC", "R-2").await.unwrap().is_none());
    assert_eq!(store.inner().all_jobs().await.len(), 1);
}

#[tokio::test]
async fn test_enrichment_failure_still_counts_new() {
    let harness = Harness::new();
    let generator = Arc::new(FailingGenerator::when_description_contains("R-2"));
    let orchestrator =
        IngestionOrchestrator::new(harness.store.clone(), harness.enrichment_with(generator.clone()));
    let source = StaticSource::new("pwc", vec![unique("R-1"), unique("R-2")]);

    let stats = orchestrator.run(&source).await;

    assert_eq!(stats.new, 2);
    assert_eq!(stats.errors, 0);
    assert_eq!(generator.failures(), 1);

    let failed_id = harness.store.find_by_identity("PwC", "R-2").await.unwrap().unwrap();
    let failed = harness.store.get_job(failed_id).await.unwrap().unwrap();
    assert_eq!(failed.status, JobStatus::Processing);
    assert!(failed.missing_enrichment());

    let ok_id = harness.store.find_by_identity("PwC", "R-1").await.unwrap().unwrap();
    let ok = harness.store.get_job(ok_id).await.unwrap().unwrap();
    assert_eq!(ok.status, JobStatus::Active);
}

#[tokio::test]
async fn test_sweep_isolates_failing_source() {
    let harness = Harness::new();
    let registry = SourceRegistry::new()
        .with_source(Arc::new(StaticSource::new("pwc", vec![unique("R-1")])))
        .with_source(Arc::new(FailingSource::new("kpmg", "connection refused")));
    let ctx = harness.context(registry);

    let report = ctx.service.ingest(&SourceSelector::All).await.unwrap();

    assert!(!report.locked_out);
    assert_eq!(report.lock, DAILY_INGESTION_LOCK);
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.failed_sources(), vec!["kpmg"]);
    assert_eq!(report.total_new(), 1);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_single_source_uses_its_own_lock() {
    let harness = Harness::new();
    let pwc_source = Arc::new(StaticSource::new("pwc", vec![unique("R-1")]));
    let ctx = harness.context(SourceRegistry::new().with_source(pwc_source.clone()));

    // the daily lock does not block a manual single-source run
    assert!(harness
        .locks
        .try_acquire(DAILY_INGESTION_LOCK, std::time::Duration::from_secs(60), "other:1")
        .await
        .unwrap());

    let report = ctx
        .service
        .ingest(&SourceSelector::One("pwc".into()))
        .await
        .unwrap();
    assert_eq!(report.lock, "ingestion:pwc");
    assert!(!report.locked_out);
    assert_eq!(pwc_source.fetches(), 1);

    let blocked = ctx.service.ingest(&SourceSelector::All).await.unwrap();
    assert!(blocked.locked_out);
    assert!(blocked.runs.is_empty());
    assert_eq!(pwc_source.fetches(), 1);

    ctx.shutdown().await;
}

#[tokio::test]
async fn test_unknown_source_is_rejected() {
    let harness = Harness::new();
    let ctx = harness.context(SourceRegistry::new());

    let result = ctx.service.ingest(&SourceSelector::parse(Some("acme"))).await;
    assert_eq!(result.unwrap_err(), SourceError::UnknownSource("acme".into()));

    ctx.shutdown().await;
}
