//! Task record storage backends.
//!
//! This module provides the trait the orchestrator persists task records
//! through, plus an in-memory implementation for testing and development.
//! Durable backends (a key-value table, a relational store) are adapters
//! supplied by the embedding service; the core only depends on the trait.

mod memory;

pub use memory::MemoryRecordStore;

use async_trait::async_trait;

use crate::error::PipelineResult;
use crate::types::{TaskId, TaskRecord, WorkspaceId};

/// Backend for storing task records.
///
/// Records are keyed by the (workspace, task) pair. Implementations must
/// make `acquire_lease` atomic: of any number of concurrent callers for the
/// same task id, exactly one may observe `true`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write a task record, replacing any existing record for the same
    /// (workspace, task) pair.
    ///
    /// Every status transition is written through here before the next
    /// stage begins, so a crash leaves the last committed state readable.
    async fn put(&self, record: &TaskRecord) -> PipelineResult<()>;

    /// Get a task record by (workspace, task) pair.
    ///
    /// Returns `None` if no record matches. The workspace id is part of the
    /// key: a valid task id paired with the wrong workspace does not
    /// resolve.
    async fn get(
        &self,
        workspace_id: &WorkspaceId,
        task_id: &TaskId,
    ) -> PipelineResult<Option<TaskRecord>>;

    /// List all records for a workspace, newest first.
    async fn list(&self, workspace_id: &WorkspaceId) -> PipelineResult<Vec<TaskRecord>>;

    /// Attempt to acquire the execution lease for a task.
    ///
    /// Returns `true` if this caller now holds the lease, `false` if another
    /// execution already holds it. Losing the race is not an error. Leases
    /// are never released by the core: a task id is executed at most once.
    async fn acquire_lease(&self, task_id: &TaskId) -> PipelineResult<bool>;
}
