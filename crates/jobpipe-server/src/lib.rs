//! Jobpipe Server Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Ingests early-career postings from employer career sites, deduplicates them,
//! enriches each one with AI-generated preparation material and keeps a run log
//! per source run.
//!
//! # Overview
//!
//! - **Sources**: adapters for Workday, Oracle HCM and server-rendered career pages
//! - **Ingestion**: dedup, enrichment, reconciliation and distributed locking
//! - **AI**: generation and embedding capabilities (OpenAI or deterministic mocks)
//! - **Database**: PostgreSQL integration with SQLx, or in-memory stores
//! - **API**: admin triggers and read endpoints over axum
//!
//! # Architecture
//!
//! The HTTP surface follows a CQRS layout under [`features`]: commands queue or
//! perform writes, queries read. Both are plain request types with `handle`
//! functions. Long-running work never runs on a request; it goes through the
//! [`ingest::TaskQueue`] or the cron schedule.
//!
//! # Example
//!
//! ```no_run
//! use jobpipe_server::{config::Config, context::AppContext, sources::SourceSelector};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let ctx = AppContext::init(Config::load()?).await?;
//!     let report = ctx.service.ingest(&SourceSelector::All).await?;
//!     tracing::info!(new = report.total_new(), "Sweep finished");
//!     ctx.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod ai;
pub mod cli;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod features;
pub mod ingest;
pub mod middleware;
pub mod models;
pub mod sources;
pub mod testing;

// Re-export commonly used types
pub use context::AppContext;
pub use error::AppError;
