//! Trigger ingestion command
//!
//! Validates the requested source against the registry, then queues the run
//! and returns immediately. The run itself reports through its run logs.

use mediator::Request;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::context::AppContext;
use crate::ingest::tasks::{TaskError, TaskKind};
use crate::sources::{SourceError, SourceSelector};

/// Command to start an ingestion run in the background
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerIngestionCommand {
    /// Source name; absent or "all" selects every source
    #[serde(default)]
    pub source: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerIngestionResponse {
    pub accepted: bool,
    pub task: Uuid,
    pub source: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TriggerIngestionError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Queue(#[from] TaskError),
}

impl Request<Result<TriggerIngestionResponse, TriggerIngestionError>> for TriggerIngestionCommand {}

impl TriggerIngestionCommand {
    pub fn selector(&self) -> SourceSelector {
        SourceSelector::parse(self.source.as_deref())
    }
}

#[tracing::instrument(skip(ctx, command), fields(source = ?command.source))]
pub async fn handle(
    ctx: &AppContext,
    command: TriggerIngestionCommand,
) -> Result<TriggerIngestionResponse, TriggerIngestionError> {
    let selector = command.selector();

    // reject unknown names up front rather than in the background worker
    ctx.service.sources().resolve(&selector)?;

    let task = ctx
        .tasks
        .submit(TaskKind::Ingest {
            selector: selector.clone(),
        })
        .await?;

    tracing::info!(task_id = %task.id, "Ingestion accepted");

    Ok(TriggerIngestionResponse {
        accepted: true,
        task: task.id,
        source: selector.label().to_string(),
    })
}
