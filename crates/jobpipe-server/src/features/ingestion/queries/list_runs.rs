//! List run logs query

use mediator::Request;
use serde::{Deserialize, Serialize};

use crate::ingest::store::{JobStore, StoreError};
use crate::models::RunLog;

pub const DEFAULT_RUNS_LIMIT: i64 = 20;
pub const MAX_RUNS_LIMIT: i64 = 200;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListRunsQuery {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListRunsResponse {
    pub runs: Vec<RunLog>,
}

#[derive(Debug, thiserror::Error)]
pub enum ListRunsError {
    #[error("limit must be between 1 and 200")]
    InvalidLimit,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl Request<Result<ListRunsResponse, ListRunsError>> for ListRunsQuery {}

impl ListRunsQuery {
    pub fn limit(&self) -> Result<i64, ListRunsError> {
        match self.limit {
            None => Ok(DEFAULT_RUNS_LIMIT),
            Some(limit) if (1..=MAX_RUNS_LIMIT).contains(&limit) => Ok(limit),
            Some(_) => Err(ListRunsError::InvalidLimit),
        }
    }
}

/// Newest first
pub async fn handle(
    store: &dyn JobStore,
    query: ListRunsQuery,
) -> Result<ListRunsResponse, ListRunsError> {
    let limit = query.limit()?;
    let source = query.source.as_deref().map(str::to_lowercase);
    let runs = store.list_run_logs(source.as_deref(), limit).await?;
    Ok(ListRunsResponse { runs })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::memory::InMemoryJobStore;

    #[test]
    fn test_limit_bounds() {
        assert_eq!(ListRunsQuery::default().limit().unwrap(), DEFAULT_RUNS_LIMIT);
        let query = |limit| ListRunsQuery {
            source: None,
            limit: Some(limit),
        };
        assert!(query(0).limit().is_err());
        assert!(query(MAX_RUNS_LIMIT + 1).limit().is_err());
        assert_eq!(query(5).limit().unwrap(), 5);
    }

    #[tokio::test]
    async fn test_filters_by_source() {
        let store = InMemoryJobStore::new();
        store.create_run_log("pwc").await.unwrap();
        store.create_run_log("ey").await.unwrap();
        store.create_run_log("pwc").await.unwrap();

        let response = handle(
            &store,
            ListRunsQuery {
                source: Some("PwC".into()),
                limit: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(response.runs.len(), 2);
        assert!(response.runs.iter().all(|run| run.source_name == "pwc"));
    }
}
