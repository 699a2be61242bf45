//! Feature modules implementing the HTTP API
//!
//! Each feature is a vertical slice with its own `commands/`, `queries/` and
//! `routes.rs`. Commands and queries are plain data types implementing
//! `mediator::Request`; their `handle` functions carry the logic.

pub mod health;
pub mod ingestion;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;

use crate::context::AppContext;
use crate::middleware;

/// Routes mounted under `/api/v1`
pub fn router(ctx: Arc<AppContext>) -> Router<()> {
    Router::new()
        .merge(ingestion::ingestion_routes())
        .with_state(ctx)
}

/// The full application: health, API and the middleware stack
pub fn app(ctx: Arc<AppContext>) -> Router {
    let cors = middleware::cors_layer(&ctx.config.cors);

    Router::new()
        .route("/health", get(health::health_check))
        .with_state(ctx.clone())
        .nest("/api/v1", router(ctx))
        // Apply layers from innermost to outermost
        .layer(CompressionLayer::new())
        .layer(middleware::tracing_layer())
        .layer(cors)
}
