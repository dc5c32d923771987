//! Parallax pipeline core.
//!
//! This crate owns the durable task state machine that turns an uploaded
//! source artifact into a pushed image: a task is created in `pending`,
//! runs through the build and push stages on a bounded worker pool, and
//! ends in `done` or `failed`. Every transition is persisted through the
//! injected [`RecordStore`] before the next stage begins, so the last
//! committed state survives a process restart.
//!
//! # State machine
//!
//! ```text
//! Pending ──▶ Building ──▶ Pushing ──▶ Done
//!                │            │
//!                ▼            ▼
//!              Failed       Failed
//! ```
//!
//! Invalid transitions are caught at compile time via the typestate wrapper
//! in [`state`]. Terminal records are never mutated again.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use parallax_pipeline::{
//!     MemoryBlobStore, MemoryRecordStore, MockBuilder, MockPusher,
//!     PipelineConfig, TaskOrchestrator, WorkspaceId,
//! };
//!
//! let store = Arc::new(MemoryRecordStore::new());
//! let blob = Arc::new(MemoryBlobStore::new());
//! let orchestrator = TaskOrchestrator::new(
//!     store,
//!     Arc::new(MockBuilder::new(blob)),
//!     Arc::new(MockPusher::new()),
//!     PipelineConfig::default(),
//! );
//!
//! orchestrator.start().await;
//! let task_id = orchestrator
//!     .submit(WorkspaceId::new("ws1"), "blob://sources/app.zip")
//!     .await?;
//! // ... poll orchestrator.get_status(&workspace, &task_id) until terminal
//! ```

#![forbid(unsafe_code)]

pub mod blob;
pub mod config;
pub mod error;
pub mod orchestrator;
pub mod queue;
pub mod stages;
pub mod state;
pub mod store;
pub mod types;
mod worker;

pub use blob::{BlobStore, MemoryBlobStore};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::TaskOrchestrator;
pub use queue::TaskQueue;
pub use stages::{Builder, MockBuilder, MockPusher, Pusher};
pub use state::{AnyTask, Building, Done, Failed, Pending, Pushing, Task, TaskState};
pub use store::{MemoryRecordStore, RecordStore};
pub use types::{
    StageKind, TaskData, TaskError, TaskId, TaskRecord, TaskResult, TaskStatus, WorkspaceId,
};
