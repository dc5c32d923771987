//! Build and push stage capabilities.
//!
//! The orchestrator treats both stages as black boxes: a builder turns a
//! source reference into an artifact reference, a pusher turns an artifact
//! reference into an image reference, and either may fail. Real toolchain
//! and registry adapters are supplied by the embedding service; the mock
//! implementations here back tests and development mode.

use std::sync::Arc;

use async_trait::async_trait;

use crate::blob::BlobStore;
use crate::error::{PipelineError, PipelineResult};

/// Capability that produces a build artifact from uploaded source.
#[async_trait]
pub trait Builder: Send + Sync {
    /// Build the source behind `source_ref` and return the artifact
    /// reference.
    async fn build(&self, source_ref: &str) -> PipelineResult<String>;
}

/// Capability that pushes a build artifact to an image registry.
#[async_trait]
pub trait Pusher: Send + Sync {
    /// Push the artifact behind `artifact_ref` to `registry_target` and
    /// return the pushed image reference.
    async fn push(&self, artifact_ref: &str, registry_target: &str) -> PipelineResult<String>;
}

/// Mock builder that records a placeholder artifact in the blob store.
pub struct MockBuilder {
    blob: Arc<dyn BlobStore>,
    fail_with: Option<String>,
}

impl MockBuilder {
    /// Create a mock builder that always succeeds.
    #[must_use]
    pub fn new(blob: Arc<dyn BlobStore>) -> Self {
        Self {
            blob,
            fail_with: None,
        }
    }

    /// Create a mock builder that fails every build with the given message.
    #[must_use]
    pub fn failing(blob: Arc<dyn BlobStore>, message: impl Into<String>) -> Self {
        Self {
            blob,
            fail_with: Some(message.into()),
        }
    }
}

#[async_trait]
impl Builder for MockBuilder {
    async fn build(&self, source_ref: &str) -> PipelineResult<String> {
        if let Some(message) = &self.fail_with {
            return Err(PipelineError::build(message.clone()));
        }

        let key = format!("artifacts/{}/app.bin", uuid::Uuid::new_v4());
        let placeholder = format!("built from {source_ref}").into_bytes();
        self.blob.store(&key, placeholder).await
    }
}

/// Mock pusher that fabricates an image reference.
#[derive(Debug, Default)]
pub struct MockPusher {
    fail_with: Option<String>,
}

impl MockPusher {
    /// Create a mock pusher that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock pusher that fails every push with the given message.
    #[must_use]
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
        }
    }
}

#[async_trait]
impl Pusher for MockPusher {
    async fn push(&self, _artifact_ref: &str, registry_target: &str) -> PipelineResult<String> {
        if let Some(message) = &self.fail_with {
            return Err(PipelineError::push(message.clone()));
        }

        let tag = uuid::Uuid::new_v4().simple().to_string();
        Ok(format!("{registry_target}:{}", &tag[..12]))
    }
}
