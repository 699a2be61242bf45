//! Ingestion feature module
//!
//! Admin triggers, on-demand enrichment, and read access to records, run logs
//! and registered sources.

pub mod commands;
pub mod queries;
pub mod routes;

pub use routes::ingestion_routes;
