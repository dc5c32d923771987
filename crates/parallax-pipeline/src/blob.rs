//! Content storage for source and build artifacts.
//!
//! The pipeline never interprets blob references: stages return a reference
//! string and the core stores and propagates it as-is. Production backends
//! (object storage) are adapters supplied by the embedding service.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::PipelineResult;

/// Backend for storing opaque blobs by key.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes under a key and return a reference to the stored object.
    async fn store(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<String>;

    /// Fetch the bytes behind a previously returned reference.
    ///
    /// Returns `None` if the reference does not resolve.
    async fn get(&self, blob_ref: &str) -> PipelineResult<Option<Vec<u8>>>;
}

/// In-memory blob store for testing and development.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, Vec<u8>>,
}

const MEMORY_SCHEME: &str = "mem://";

impl MemoryBlobStore {
    /// Create a new empty in-memory blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn store(&self, key: &str, bytes: Vec<u8>) -> PipelineResult<String> {
        self.objects.insert(key.to_owned(), bytes);
        Ok(format!("{MEMORY_SCHEME}{key}"))
    }

    async fn get(&self, blob_ref: &str) -> PipelineResult<Option<Vec<u8>>> {
        let key = blob_ref.strip_prefix(MEMORY_SCHEME).unwrap_or(blob_ref);
        Ok(self.objects.get(key).map(|b| b.value().clone()))
    }
}
