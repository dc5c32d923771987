//! Error types for the pipeline core.

/// Result type alias using [`PipelineError`].
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Errors that can occur in the task pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Malformed request, rejected before any record is created.
    #[error("validation error: {0}")]
    Validation(String),

    /// No task matches the (workspace, task) pair.
    #[error("task not found: {task_id} in workspace {workspace_id}")]
    TaskNotFound {
        /// The requested task id.
        task_id: String,
        /// The workspace the lookup was scoped to.
        workspace_id: String,
    },

    /// Build stage failure.
    #[error("build failed: {0}")]
    Build(String),

    /// Push stage failure.
    #[error("push failed: {0}")]
    Push(String),

    /// Record or blob store failure.
    #[error("store error: {0}")]
    Store(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PipelineError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a build stage error.
    #[must_use]
    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    /// Create a push stage error.
    #[must_use]
    pub fn push(msg: impl Into<String>) -> Self {
        Self::Push(msg.into())
    }

    /// Create a store error.
    #[must_use]
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
