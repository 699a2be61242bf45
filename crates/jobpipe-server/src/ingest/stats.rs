//! Counters collected during one source run

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{RunOutcome, RunStatus};

/// Per-run statistics. `new + skipped + errors == fetched` once the run is over.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestStats {
    pub source: String,
    pub run_id: Option<Uuid>,
    pub fetched: i64,
    pub new: i64,
    pub skipped: i64,
    pub errors: i64,
    /// Subset of `new` whose enrichment was cloned from a hash match
    pub dedup_hits: i64,
    /// Set when the fetch itself failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
}

impl IngestStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn inc_new(&mut self) {
        self.new += 1;
    }

    pub fn inc_dedup_hit(&mut self) {
        self.new += 1;
        self.dedup_hits += 1;
    }

    pub fn inc_skipped(&mut self) {
        self.skipped += 1;
    }

    pub fn inc_errors(&mut self) {
        self.errors += 1;
    }

    pub fn status(&self) -> RunStatus {
        if self.fetch_error.is_some() {
            return RunStatus::Failed;
        }
        RunStatus::from_counts(self.new, self.errors)
    }

    /// Every fetched posting landed in exactly one bucket
    pub fn is_partition(&self) -> bool {
        self.new + self.skipped + self.errors == self.fetched
    }

    /// Terminal run-log update for a run that got past the fetch
    pub fn outcome(&self) -> RunOutcome {
        let clamp = |v: i64| i32::try_from(v).unwrap_or(i32::MAX);
        RunOutcome {
            status: self.status(),
            jobs_found: clamp(self.fetched),
            jobs_new: clamp(self.new),
            jobs_skipped: clamp(self.skipped),
            error_count: clamp(self.errors),
            error_message: None,
            traceback: None,
        }
    }
}
