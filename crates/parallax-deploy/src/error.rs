//! Error types for manifest synthesis and deployment.

/// Result type alias using [`DeployError`].
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while synthesizing or applying a workload.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Malformed request, rejected before any cluster call is made.
    #[error("validation error: {0}")]
    Validation(String),

    /// Both a fixed replica count and autoscaling were requested.
    ///
    /// The scaling intent is ambiguous; the request is rejected rather than
    /// silently preferring one policy.
    #[error("conflicting scaling intent: {0}")]
    ScalingConflict(String),

    /// Cluster lookup or apply failure, surfaced verbatim.
    #[error("cluster error: {0}")]
    Cluster(String),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DeployError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a cluster error.
    #[must_use]
    pub fn cluster(msg: impl Into<String>) -> Self {
        Self::Cluster(msg.into())
    }

    /// Create an internal error.
    #[must_use]
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
