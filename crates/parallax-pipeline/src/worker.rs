//! Pipeline worker implementation.
//!
//! Workers pull tasks from the queue and drive them through the build and
//! push stages, persisting every transition before the next stage begins.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{PipelineError, PipelineResult};
use crate::queue::TaskQueue;
use crate::stages::{Builder, Pusher};
use crate::state::{Pending, Task};
use crate::store::RecordStore;
use crate::types::{TaskData, TaskError, TaskId, TaskRecord, TaskResult, TaskStatus, WorkspaceId};

/// Worker that executes pipeline tasks from the queue.
pub struct PipelineWorker {
    id: usize,
    queue: Arc<TaskQueue>,
    store: Arc<dyn RecordStore>,
    builder: Arc<dyn Builder>,
    pusher: Arc<dyn Pusher>,
    registry_target: String,
}

impl PipelineWorker {
    /// Create a new pipeline worker.
    #[must_use]
    pub fn new(
        id: usize,
        queue: Arc<TaskQueue>,
        store: Arc<dyn RecordStore>,
        builder: Arc<dyn Builder>,
        pusher: Arc<dyn Pusher>,
        registry_target: impl Into<String>,
    ) -> Self {
        Self {
            id,
            queue,
            store,
            builder,
            pusher,
            registry_target: registry_target.into(),
        }
    }

    /// Run the worker loop until the cancellation token is triggered.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(worker_id = self.id, "pipeline worker started");

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    info!(worker_id = self.id, "pipeline worker shutting down");
                    break;
                }

                data = self.queue.next() => {
                    self.process_task(data).await;
                }
            }
        }

        info!(worker_id = self.id, "pipeline worker stopped");
    }

    async fn process_task(&self, data: TaskData) {
        let task_id = data.id.clone();
        let workspace_id = data.workspace_id.clone();

        // At most one execution per task id: the store arbitrates via a
        // compare-and-set lease. Losing the race is a no-op, not an error.
        match self.store.acquire_lease(&task_id).await {
            Ok(true) => {}
            Ok(false) => {
                debug!(worker_id = self.id, task_id = %task_id, "execution lease already held, skipping");
                return;
            }
            Err(e) => {
                warn!(worker_id = self.id, task_id = %task_id, error = %e, "failed to acquire execution lease");
                return;
            }
        }

        info!(
            worker_id = self.id,
            task_id = %task_id,
            workspace = %workspace_id,
            "starting pipeline execution"
        );

        self.queue.task_started();

        // Stage execution runs in its own task so that a panic inside a
        // stage call cannot take the worker down or leave the record
        // stranded in a non-terminal state.
        let execution = tokio::spawn(execute_stages(
            Arc::clone(&self.store),
            Arc::clone(&self.builder),
            Arc::clone(&self.pusher),
            self.registry_target.clone(),
            data,
        ));

        match execution.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!(task_id = %task_id, error = %e, "failed to persist task transition");
                self.mark_failed(&workspace_id, &task_id, &e.to_string()).await;
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "stage execution aborted");
                self.mark_failed(&workspace_id, &task_id, "stage execution aborted unexpectedly")
                    .await;
            }
        }

        self.queue.task_finished();
    }

    /// Best-effort transition to failed for a task whose execution died
    /// outside the normal stage error paths.
    async fn mark_failed(&self, workspace_id: &WorkspaceId, task_id: &TaskId, message: &str) {
        let record = match self.store.get(workspace_id, task_id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(task_id = %task_id, "cannot fail task: record not found");
                return;
            }
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "cannot fail task: store unavailable");
                return;
            }
        };

        if record.status.is_terminal() {
            return;
        }

        let mut data = record.data;
        data.error = Some(TaskError::internal(message));
        data.updated_at = chrono::Utc::now();

        let failed = TaskRecord {
            data,
            status: TaskStatus::Failed,
        };

        if let Err(e) = self.store.put(&failed).await {
            error!(task_id = %task_id, error = %e, "failed to persist failure transition");
        }
    }
}

impl std::fmt::Debug for PipelineWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineWorker")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Drive one task through build and push.
///
/// Each transition is written to the store before the next stage begins, so
/// a crash between stages leaves the last committed state readable. Stage
/// failures are captured into the record and are not errors of this
/// function; only store failures propagate.
async fn execute_stages(
    store: Arc<dyn RecordStore>,
    builder: Arc<dyn Builder>,
    pusher: Arc<dyn Pusher>,
    registry_target: String,
    data: TaskData,
) -> PipelineResult<()> {
    let building = Task::<Pending>::create(data).start_build();
    store.put(&building.record()).await?;
    info!(task_id = %building.id(), "build stage started");

    let artifact_ref = match builder.build(&building.data().source_ref).await {
        Ok(artifact_ref) => artifact_ref,
        Err(e) => {
            let failed = building.fail(TaskError::build(stage_message(&e)));
            store.put(&failed.record()).await?;
            error!(task_id = %failed.id(), error = %e, "build stage failed");
            return Ok(());
        }
    };

    let pushing = building.start_push();
    store.put(&pushing.record()).await?;
    info!(task_id = %pushing.id(), artifact_ref = %artifact_ref, "push stage started");

    match pusher.push(&artifact_ref, &registry_target).await {
        Ok(image_ref) => {
            let done = pushing.complete(TaskResult {
                artifact_ref,
                image_ref,
            });
            store.put(&done.record()).await?;
            info!(task_id = %done.id(), "pipeline completed");
        }
        Err(e) => {
            let failed = pushing.fail(TaskError::push(stage_message(&e)));
            store.put(&failed.record()).await?;
            error!(task_id = %failed.id(), error = %e, "push stage failed");
        }
    }

    Ok(())
}

/// Extract the stage's own message so it is captured verbatim, without the
/// error enum's prefix.
fn stage_message(e: &PipelineError) -> String {
    match e {
        PipelineError::Build(msg) | PipelineError::Push(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::blob::{BlobStore, MemoryBlobStore};
    use crate::stages::{MockBuilder, MockPusher};
    use crate::store::MemoryRecordStore;
    use crate::types::StageKind;

    const REGISTRY: &str = "registry.local/apps";

    fn spawn_worker(
        store: Arc<dyn RecordStore>,
        builder: Arc<dyn Builder>,
        pusher: Arc<dyn Pusher>,
    ) -> (Arc<TaskQueue>, CancellationToken, tokio::task::JoinHandle<()>) {
        let queue = Arc::new(TaskQueue::new());
        let cancel = CancellationToken::new();

        let worker = PipelineWorker::new(0, Arc::clone(&queue), store, builder, pusher, REGISTRY);
        let token = cancel.clone();
        let handle = tokio::spawn(async move { worker.run(token).await });

        (queue, cancel, handle)
    }

    async fn wait_terminal(
        store: &Arc<dyn RecordStore>,
        workspace_id: &WorkspaceId,
        task_id: &TaskId,
    ) -> TaskRecord {
        for _ in 0..100 {
            if let Some(record) = store
                .get(workspace_id, task_id)
                .await
                .expect("store get failed")
            {
                if record.status.is_terminal() {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task did not reach a terminal state");
    }

    #[tokio::test]
    async fn successful_pipeline() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let builder: Arc<dyn Builder> = Arc::new(MockBuilder::new(blob));
        let pusher: Arc<dyn Pusher> = Arc::new(MockPusher::new());

        let (queue, cancel, handle) = spawn_worker(Arc::clone(&store), builder, pusher);

        let data = TaskData::new(WorkspaceId::new("ws1"), "mem://sources/app.zip");
        let workspace_id = data.workspace_id.clone();
        let task_id = data.id.clone();

        store.put(&TaskRecord::new(data.clone())).await.expect("put");
        queue.push(data).await;

        let record = wait_terminal(&store, &workspace_id, &task_id).await;
        assert_eq!(record.status, TaskStatus::Done);

        let result = record.data.result.expect("result must be set");
        assert!(!result.artifact_ref.is_empty());
        assert!(result.image_ref.starts_with(REGISTRY));
        assert!(record.data.error.is_none());

        cancel.cancel();
        handle.await.expect("worker task");
    }

    #[tokio::test]
    async fn build_failure_short_circuits() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let builder: Arc<dyn Builder> =
            Arc::new(MockBuilder::failing(blob, "compiler exited with status 1"));
        let pusher: Arc<dyn Pusher> = Arc::new(MockPusher::new());

        let (queue, cancel, handle) = spawn_worker(Arc::clone(&store), builder, pusher);

        let data = TaskData::new(WorkspaceId::new("ws1"), "mem://sources/app.zip");
        let workspace_id = data.workspace_id.clone();
        let task_id = data.id.clone();

        store.put(&TaskRecord::new(data.clone())).await.expect("put");
        queue.push(data).await;

        let record = wait_terminal(&store, &workspace_id, &task_id).await;
        assert_eq!(record.status, TaskStatus::Failed);
        assert!(record.data.result.is_none());

        let error = record.data.error.expect("error must be set");
        assert_eq!(error.kind, StageKind::Build);
        assert_eq!(error.message, "compiler exited with status 1");

        cancel.cancel();
        handle.await.expect("worker task");
    }

    #[tokio::test]
    async fn push_failure_is_captured() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let builder: Arc<dyn Builder> = Arc::new(MockBuilder::new(blob));
        let pusher: Arc<dyn Pusher> = Arc::new(MockPusher::failing("registry unreachable"));

        let (queue, cancel, handle) = spawn_worker(Arc::clone(&store), builder, pusher);

        let data = TaskData::new(WorkspaceId::new("ws1"), "mem://sources/app.zip");
        let workspace_id = data.workspace_id.clone();
        let task_id = data.id.clone();

        store.put(&TaskRecord::new(data.clone())).await.expect("put");
        queue.push(data).await;

        let record = wait_terminal(&store, &workspace_id, &task_id).await;
        assert_eq!(record.status, TaskStatus::Failed);

        let error = record.data.error.expect("error must be set");
        assert_eq!(error.kind, StageKind::Push);
        assert_eq!(error.message, "registry unreachable");

        cancel.cancel();
        handle.await.expect("worker task");
    }

    #[tokio::test]
    async fn held_lease_skips_execution() {
        let store: Arc<dyn RecordStore> = Arc::new(MemoryRecordStore::new());
        let blob: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
        let builder: Arc<dyn Builder> = Arc::new(MockBuilder::new(blob));
        let pusher: Arc<dyn Pusher> = Arc::new(MockPusher::new());

        let (queue, cancel, handle) = spawn_worker(Arc::clone(&store), builder, pusher);

        let data = TaskData::new(WorkspaceId::new("ws1"), "mem://sources/app.zip");
        let workspace_id = data.workspace_id.clone();
        let task_id = data.id.clone();

        // Another execution already holds the lease.
        assert!(store.acquire_lease(&task_id).await.expect("lease"));

        store.put(&TaskRecord::new(data.clone())).await.expect("put");
        queue.push(data).await;

        tokio::time::sleep(Duration::from_millis(100)).await;

        let record = store
            .get(&workspace_id, &task_id)
            .await
            .expect("get")
            .expect("record");
        assert_eq!(record.status, TaskStatus::Pending);

        cancel.cancel();
        handle.await.expect("worker task");
    }
}
