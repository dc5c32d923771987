//! In-memory record store for testing and development.

use async_trait::async_trait;
use dashmap::{DashMap, DashSet};

use crate::error::PipelineResult;
use crate::types::{TaskId, TaskRecord, WorkspaceId};

use super::RecordStore;

/// In-memory record store.
///
/// Not suitable for production use: records are lost when the process
/// exits, which also means no task survives a restart for inspection.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: DashMap<(String, String), TaskRecord>,
    leases: DashSet<String>,
}

impl MemoryRecordStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(workspace_id: &WorkspaceId, task_id: &TaskId) -> (String, String) {
        (
            workspace_id.as_str().to_owned(),
            task_id.as_str().to_owned(),
        )
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn put(&self, record: &TaskRecord) -> PipelineResult<()> {
        let key = Self::key(&record.data.workspace_id, &record.data.id);
        self.records.insert(key, record.clone());
        Ok(())
    }

    async fn get(
        &self,
        workspace_id: &WorkspaceId,
        task_id: &TaskId,
    ) -> PipelineResult<Option<TaskRecord>> {
        let key = Self::key(workspace_id, task_id);
        Ok(self.records.get(&key).map(|r| r.value().clone()))
    }

    async fn list(&self, workspace_id: &WorkspaceId) -> PipelineResult<Vec<TaskRecord>> {
        let mut results: Vec<TaskRecord> = self
            .records
            .iter()
            .filter(|entry| entry.key().0 == workspace_id.as_str())
            .map(|entry| entry.value().clone())
            .collect();

        results.sort_by(|a, b| b.data.created_at.cmp(&a.data.created_at));
        Ok(results)
    }

    async fn acquire_lease(&self, task_id: &TaskId) -> PipelineResult<bool> {
        Ok(self.leases.insert(task_id.as_str().to_owned()))
    }
}
