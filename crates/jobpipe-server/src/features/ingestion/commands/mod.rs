//! Write operations: triggers and on-demand enrichment

pub mod enrich_job;
pub mod reconcile;
pub mod trigger_ingestion;

pub use enrich_job::{EnrichJobCommand, EnrichJobError, EnrichJobResponse};
pub use reconcile::{ReconcileCommand, ReconcileCommandError, ReconcileResponse};
pub use trigger_ingestion::{TriggerIngestionCommand, TriggerIngestionError, TriggerIngestionResponse};
