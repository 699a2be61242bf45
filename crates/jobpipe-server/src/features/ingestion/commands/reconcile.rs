//! Reconcile command
//!
//! Queues a reconciliation sweep. `scope=missing` (the default) heals records
//! lacking enrichment; `scope=all` regenerates enrichment for every active record.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::ingest::reconcile::ReconcileScope;
use crate::ingest::tasks::{TaskError, TaskKind};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReconcileCommand {
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileResponse {
    pub accepted: bool,
    pub task: Uuid,
    pub scope: ReconcileScope,
}

#[derive(Debug, thiserror::Error)]
pub enum ReconcileCommandError {
    #[error("Invalid scope '{0}', expected 'missing' or 'all'")]
    InvalidScope(String),

    #[error(transparent)]
    Queue(#[from] TaskError),
}

impl Request<Result<ReconcileResponse, ReconcileCommandError>> for ReconcileCommand {}

impl ReconcileCommand {
    pub fn validate(&self) -> Result<ReconcileScope, ReconcileCommandError> {
        match self.scope.as_deref().map(str::trim) {
            None | Some("") => Ok(ReconcileScope::default()),
            Some(raw) => raw
                .parse()
                .map_err(|_| ReconcileCommandError::InvalidScope(raw.to_string())),
        }
    }
}

#[tracing::instrument(skip(ctx, command), fields(scope = ?command.scope))]
pub async fn handle(
    ctx: &AppContext,
    command: ReconcileCommand,
) -> Result<ReconcileResponse, ReconcileCommandError> {
    let scope = command.validate()?;
    let task = ctx.tasks.submit(TaskKind::Reconcile { scope }).await?;

    tracing::info!(task_id = %task.id, %scope, "Reconciliation accepted");

    Ok(ReconcileResponse {
        accepted: true,
        task: task.id,
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_validation() {
        let scope = |raw: Option<&str>| {
            ReconcileCommand {
                scope: raw.map(str::to_string),
            }
            .validate()
        };

        assert_eq!(scope(None).unwrap(), ReconcileScope::Missing);
        assert_eq!(scope(Some("all")).unwrap(), ReconcileScope::All);
        assert!(matches!(
            scope(Some("everything")),
            Err(ReconcileCommandError::InvalidScope(_))
        ));
    }
}
