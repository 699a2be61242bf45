//! Ingestion routes
//!
//! Admin triggers answer 202 and hand the work to the task queue. On-demand
//! enrichment is the one synchronous write and is bounded by a timeout.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use super::commands::{
    enrich_job, reconcile, trigger_ingestion, EnrichJobCommand, EnrichJobError, ReconcileCommand,
    ReconcileCommandError, TriggerIngestionCommand, TriggerIngestionError,
};
use super::queries::{
    get_job, list_runs, list_sources, GetJobError, GetJobQuery, ListRunsError, ListRunsQuery,
    ListSourcesQuery,
};
use crate::context::AppContext;
use crate::error::AppError;

pub fn ingestion_routes() -> Router<Arc<AppContext>> {
    Router::new()
        .route("/admin/ingest", post(trigger_ingestion_handler))
        .route("/admin/reconcile", post(reconcile_handler))
        .route("/jobs/:id", get(get_job_handler))
        .route("/jobs/:id/enrich", post(enrich_job_handler))
        .route("/runs", get(list_runs_handler))
        .route("/sources", get(list_sources_handler))
}

/// POST /admin/ingest?source=pwc
async fn trigger_ingestion_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(command): Query<TriggerIngestionCommand>,
) -> Result<Response, AppError> {
    let response = trigger_ingestion::handle(&ctx, command).await?;
    Ok((StatusCode::ACCEPTED, Json(json!(response))).into_response())
}

/// POST /admin/reconcile?scope=missing|all
async fn reconcile_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(command): Query<ReconcileCommand>,
) -> Result<Response, AppError> {
    let response = reconcile::handle(&ctx, command).await?;
    Ok((StatusCode::ACCEPTED, Json(json!(response))).into_response())
}

/// POST /jobs/:id/enrich
async fn enrich_job_handler(
    State(ctx): State<Arc<AppContext>>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = enrich_job::handle(&ctx, EnrichJobCommand { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// GET /jobs/:id
async fn get_job_handler(
    State(ctx): State<Arc<AppContext>>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let job = get_job::handle(ctx.store.as_ref(), GetJobQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(json!(job))).into_response())
}

/// GET /runs?source=pwc&limit=20
async fn list_runs_handler(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Response, AppError> {
    let response = list_runs::handle(ctx.store.as_ref(), query).await?;
    Ok((StatusCode::OK, Json(json!(response))).into_response())
}

/// GET /sources
async fn list_sources_handler(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    Json(json!(list_sources::handle(ctx.service.sources(), ListSourcesQuery)))
}

impl From<TriggerIngestionError> for AppError {
    fn from(err: TriggerIngestionError) -> Self {
        match err {
            TriggerIngestionError::Source(e) => e.into(),
            TriggerIngestionError::Queue(e) => e.into(),
        }
    }
}

impl From<ReconcileCommandError> for AppError {
    fn from(err: ReconcileCommandError) -> Self {
        match err {
            ReconcileCommandError::InvalidScope(_) => AppError::Validation(err.to_string()),
            ReconcileCommandError::Queue(e) => e.into(),
        }
    }
}

impl From<EnrichJobError> for AppError {
    fn from(err: EnrichJobError) -> Self {
        match err {
            EnrichJobError::NotFound(id) => AppError::NotFound(format!("Job {} not found", id)),
            EnrichJobError::Timeout(secs) => AppError::Timeout(secs),
            EnrichJobError::Failed(message) => AppError::EnrichmentFailed(message),
            EnrichJobError::Store(e) => e.into(),
        }
    }
}

impl From<GetJobError> for AppError {
    fn from(err: GetJobError) -> Self {
        match err {
            GetJobError::NotFound => AppError::NotFound("Job not found".to_string()),
            GetJobError::Store(e) => e.into(),
        }
    }
}

impl From<ListRunsError> for AppError {
    fn from(err: ListRunsError) -> Self {
        match err {
            ListRunsError::InvalidLimit => AppError::Validation(err.to_string()),
            ListRunsError::Store(e) => e.into(),
        }
    }
}
