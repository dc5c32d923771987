//! Task orchestration entry points.
//!
//! The orchestrator owns the task state machine: it creates records,
//! schedules background execution on the worker pool, and serves status
//! reads. Each instance is constructed with its store and stage
//! dependencies; there is no process-wide registry.

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::queue::TaskQueue;
use crate::stages::{Builder, Pusher};
use crate::state::{Pending, Task};
use crate::store::RecordStore;
use crate::types::{TaskData, TaskId, TaskRecord, WorkspaceId};
use crate::worker::PipelineWorker;

/// Orchestrates build-and-push pipeline tasks.
pub struct TaskOrchestrator {
    store: Arc<dyn RecordStore>,
    builder: Arc<dyn Builder>,
    pusher: Arc<dyn Pusher>,
    queue: Arc<TaskQueue>,
    config: PipelineConfig,
    cancel: CancellationToken,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskOrchestrator {
    /// Create a new orchestrator.
    ///
    /// No workers run until [`start`](Self::start) is called.
    #[must_use]
    pub fn new(
        store: Arc<dyn RecordStore>,
        builder: Arc<dyn Builder>,
        pusher: Arc<dyn Pusher>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            store,
            builder,
            pusher,
            queue: Arc::new(TaskQueue::new()),
            config,
            cancel: CancellationToken::new(),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Start the worker pool.
    pub async fn start(&self) {
        let mut workers = self.workers.lock().await;
        if !workers.is_empty() {
            warn!("worker pool already started");
            return;
        }

        for id in 0..self.config.workers.max(1) {
            let worker = PipelineWorker::new(
                id,
                Arc::clone(&self.queue),
                Arc::clone(&self.store),
                Arc::clone(&self.builder),
                Arc::clone(&self.pusher),
                self.config.registry_target.clone(),
            );
            let cancel = self.cancel.clone();
            workers.push(tokio::spawn(async move { worker.run(cancel).await }));
        }

        info!(workers = workers.len(), "pipeline worker pool started");
    }

    /// Stop the worker pool and wait for in-flight executions to settle.
    pub async fn shutdown(&self) {
        self.cancel.cancel();

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker task join failed");
            }
        }

        info!("pipeline worker pool stopped");
    }

    /// Submit a new pipeline task.
    ///
    /// Creates a pending record, schedules background execution and returns
    /// immediately; no stage runs on the caller's path. Progress is
    /// observed by polling [`get_status`](Self::get_status).
    pub async fn submit(
        &self,
        workspace_id: WorkspaceId,
        source_ref: impl Into<String>,
    ) -> PipelineResult<TaskId> {
        let source_ref = source_ref.into();

        if workspace_id.as_str().trim().is_empty() {
            return Err(PipelineError::validation("workspace_id must not be empty"));
        }
        if source_ref.trim().is_empty() {
            return Err(PipelineError::validation("source_ref must not be empty"));
        }

        let data = TaskData::new(workspace_id, source_ref);
        let task = Task::<Pending>::create(data);
        let task_id = task.id().clone();

        self.store.put(&task.record()).await?;

        info!(
            task_id = %task_id,
            workspace = %task.data().workspace_id,
            "task submitted"
        );

        self.queue.push(task.into_data()).await;

        Ok(task_id)
    }

    /// Get the current record for a task.
    ///
    /// The lookup is scoped to the workspace: a valid task id queried with
    /// the wrong workspace fails with `TaskNotFound`.
    pub async fn get_status(
        &self,
        workspace_id: &WorkspaceId,
        task_id: &TaskId,
    ) -> PipelineResult<TaskRecord> {
        self.store
            .get(workspace_id, task_id)
            .await?
            .ok_or_else(|| PipelineError::TaskNotFound {
                task_id: task_id.to_string(),
                workspace_id: workspace_id.to_string(),
            })
    }

    /// List all task records for a workspace, newest first.
    pub async fn list_for_workspace(
        &self,
        workspace_id: &WorkspaceId,
    ) -> PipelineResult<Vec<TaskRecord>> {
        self.store.list(workspace_id).await
    }

    /// Number of tasks waiting for a worker.
    pub async fn pending_count(&self) -> usize {
        self.queue.pending_count().await
    }

    /// Number of tasks currently executing.
    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.queue.in_flight_count()
    }
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
