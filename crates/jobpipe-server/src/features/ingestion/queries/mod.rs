//! Read operations over job records, run logs and the source registry

pub mod get_job;
pub mod list_runs;
pub mod list_sources;

pub use get_job::{GetJobError, GetJobQuery, JobView};
pub use list_runs::{ListRunsError, ListRunsQuery, ListRunsResponse};
pub use list_sources::{ListSourcesQuery, ListSourcesResponse};
