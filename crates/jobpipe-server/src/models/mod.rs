//! Domain types shared by the pipeline, the stores and the API
//!
//! - [`job`]: postings as fetched and job records as persisted
//! - [`run_log`]: the per-run audit trail

pub mod job;
pub mod run_log;

pub use job::{
    Enrichment, JobRecord, JobStatus, NewJob, PrepQuestion, RawPosting, ENRICHMENT_ITEMS,
    MAX_EXTRACTED_SKILLS,
};
pub use run_log::{RunLog, RunOutcome, RunStatus};
