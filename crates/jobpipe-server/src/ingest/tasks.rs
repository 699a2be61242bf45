//! Background task queue for triggered runs
//!
//! Admin triggers never wait for a pipeline to finish. They hand an
//! [`IngestTask`] to the queue and return; a small pool of workers drains it.
//! Outcomes land in run logs and record status only.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use super::reconcile::ReconcileScope;
use super::service::IngestService;
use crate::sources::SourceSelector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    Ingest { selector: SourceSelector },
    Reconcile { scope: ReconcileScope },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestTask {
    pub id: Uuid,
    pub kind: TaskKind,
    pub submitted_at: DateTime<Utc>,
}

impl IngestTask {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            submitted_at: Utc::now(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("Task queue is full")]
    QueueFull,

    #[error("Task queue is shut down")]
    Closed,
}

pub struct TaskQueue {
    sender: Mutex<Option<mpsc::Sender<IngestTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Spawn `workers` consumers sharing one bounded channel
    pub fn start(service: Arc<IngestService>, workers: usize, capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel::<IngestTask>(capacity.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let service = service.clone();
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    loop {
                        // hold the receiver lock only while waiting for the next task
                        let task = receiver.lock().await.recv().await;
                        let Some(task) = task else {
                            break;
                        };
                        let span = tracing::info_span!("task", task_id = %task.id, worker);
                        execute(&service, task).instrument(span).await;
                    }
                    info!(worker, "Task worker stopped");
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(handles),
        }
    }

    /// Enqueue without waiting for capacity
    pub async fn submit(&self, kind: TaskKind) -> Result<IngestTask, TaskError> {
        let task = IngestTask::new(kind);
        let guard = self.sender.lock().await;
        let sender = guard.as_ref().ok_or(TaskError::Closed)?;

        sender.try_send(task.clone()).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TaskError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => TaskError::Closed,
        })?;

        info!(task_id = %task.id, kind = ?task.kind, "Task queued");
        Ok(task)
    }

    /// Stop accepting tasks and wait for queued ones to finish
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();

        let handles = std::mem::take(&mut *self.workers.lock().await);
        for handle in handles {
            if let Err(e) = handle.await {
                error!(error = %e, "Task worker panicked");
            }
        }
    }
}

async fn execute(service: &IngestService, task: IngestTask) {
    match task.kind {
        TaskKind::Ingest { selector } => match service.ingest(&selector).await {
            Ok(report) if report.locked_out => {
                info!(lock = %report.lock, "Ingestion skipped, lock held elsewhere");
            },
            Ok(report) => {
                info!(
                    sources = report.runs.len(),
                    new = report.total_new(),
                    failed_sources = ?report.failed_sources(),
                    "Triggered ingestion finished"
                );
            },
            Err(e) => warn!(error = %e, "Triggered ingestion rejected"),
        },
        TaskKind::Reconcile { scope } => {
            let report = service.reconcile(scope).await;
            info!(
                succeeded = report.succeeded,
                failed = report.failed,
                "Triggered reconciliation finished"
            );
        },
    }
}
