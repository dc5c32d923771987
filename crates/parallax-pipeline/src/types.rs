//! Core types for the task pipeline.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a pipeline task.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Create a task ID from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new unique task ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for TaskId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Caller-supplied workspace partition key.
///
/// All task records are scoped to a workspace; there is no cross-workspace
/// visibility.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkspaceId(String);

impl WorkspaceId {
    /// Create a workspace ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for WorkspaceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Persisted task status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Task created, waiting for a worker.
    Pending,
    /// Build stage in progress.
    Building,
    /// Push stage in progress.
    Pushing,
    /// Pipeline completed successfully.
    Done,
    /// Pipeline failed during build or push.
    Failed,
}

impl TaskStatus {
    /// Get the status name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Building => "building",
            Self::Pushing => "pushing",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Check if this is a terminal status.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "building" => Ok(Self::Building),
            "pushing" => Ok(Self::Pushing),
            "done" => Ok(Self::Done),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("unknown task status: {s}")),
        }
    }
}

/// Which part of the pipeline produced a task failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    /// Build stage.
    Build,
    /// Push stage.
    Push,
    /// Fault outside any stage call (worker internals).
    Internal,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Build => write!(f, "build"),
            Self::Push => write!(f, "push"),
            Self::Internal => write!(f, "internal"),
        }
    }
}

/// Error captured into a failed task record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskError {
    /// Stage that produced the failure.
    pub kind: StageKind,
    /// Human-readable message, captured verbatim from the stage.
    pub message: String,
}

impl TaskError {
    /// Capture a build stage failure.
    #[must_use]
    pub fn build(message: impl Into<String>) -> Self {
        Self {
            kind: StageKind::Build,
            message: message.into(),
        }
    }

    /// Capture a push stage failure.
    #[must_use]
    pub fn push(message: impl Into<String>) -> Self {
        Self {
            kind: StageKind::Push,
            message: message.into(),
        }
    }

    /// Capture an internal fault.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: StageKind::Internal,
            message: message.into(),
        }
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Result of a completed pipeline, present only on done tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Location of the build artifact, as returned by the builder.
    pub artifact_ref: String,
    /// Reference of the pushed image, as returned by the pusher.
    pub image_ref: String,
}

/// Common data shared across all task states.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskData {
    /// Unique task identifier.
    pub id: TaskId,
    /// Workspace the task belongs to.
    pub workspace_id: WorkspaceId,
    /// Reference to the uploaded source artifact.
    pub source_ref: String,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated. Advances on every transition.
    pub updated_at: DateTime<Utc>,
    /// Pipeline result, set only when the task is done.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskResult>,
    /// Failure details, set only when the task has failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskData {
    /// Create new task data with a generated ID.
    #[must_use]
    pub fn new(workspace_id: WorkspaceId, source_ref: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::generate(),
            workspace_id,
            source_ref: source_ref.into(),
            created_at: now,
            updated_at: now,
            result: None,
            error: None,
        }
    }
}

/// A task record as held in the record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    /// The task data.
    #[serde(flatten)]
    pub data: TaskData,
    /// Current status.
    pub status: TaskStatus,
}

impl TaskRecord {
    /// Create a new record in the pending status.
    #[must_use]
    pub const fn new(data: TaskData) -> Self {
        Self {
            data,
            status: TaskStatus::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_generates_unique_values() {
        let id1 = TaskId::generate();
        let id2 = TaskId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn status_roundtrip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Building,
            TaskStatus::Pushing,
            TaskStatus::Done,
            TaskStatus::Failed,
        ] {
            let parsed: TaskStatus = status.as_str().parse().expect("parse");
            assert_eq!(parsed, status);
        }
        assert!("bogus".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!TaskStatus::Pending.is_terminal());
        assert!(!TaskStatus::Building.is_terminal());
        assert!(!TaskStatus::Pushing.is_terminal());
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
    }

    #[test]
    fn new_record_starts_pending() {
        let data = TaskData::new(WorkspaceId::new("ws1"), "blob://sources/app.zip");
        let record = TaskRecord::new(data);
        assert_eq!(record.status, TaskStatus::Pending);
        assert!(record.data.result.is_none());
        assert!(record.data.error.is_none());
        assert_eq!(record.data.created_at, record.data.updated_at);
    }

    #[test]
    fn task_error_display() {
        let error = TaskError::build("compiler exited with status 1");
        assert_eq!(error.to_string(), "build: compiler exited with status 1");
    }
}
