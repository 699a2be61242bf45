//! Run log: one audit row per source run

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a run. `Running` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Success,
    Partial,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    /// Terminal status derived from a completed run's counters
    pub fn from_counts(new: i64, errors: i64) -> Self {
        match (errors > 0, new > 0) {
            (true, false) => RunStatus::Failed,
            (true, true) => RunStatus::Partial,
            (false, _) => RunStatus::Success,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(RunStatus::Running),
            "success" => Ok(RunStatus::Success),
            "partial" => Ok(RunStatus::Partial),
            "failed" => Ok(RunStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid run status: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RunLog {
    pub id: Uuid,
    pub source_name: String,
    pub status: RunStatus,
    pub jobs_found: i32,
    pub jobs_new: i32,
    pub jobs_skipped: i32,
    pub error_count: i32,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub traceback: Option<String>,
}

/// The single terminal update applied to a running log
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub jobs_found: i32,
    pub jobs_new: i32,
    pub jobs_skipped: i32,
    pub error_count: i32,
    pub error_message: Option<String>,
    pub traceback: Option<String>,
}

impl RunOutcome {
    /// Outcome for a run whose fetch failed before any posting was seen
    pub fn fetch_failed(error: &anyhow::Error) -> Self {
        Self {
            status: RunStatus::Failed,
            jobs_found: 0,
            jobs_new: 0,
            jobs_skipped: 0,
            error_count: 0,
            error_message: Some(format!("{:#}", error)),
            traceback: Some(format!("{:?}", error)),
        }
    }
}
