//! Parallax HTTP service.
//!
//! Exposes the pipeline and deployment cores over HTTP:
//!
//! - `POST /api/v1/tasks` submits a build-and-push task and returns the
//!   task id immediately; progress is observed by polling
//!   `GET /api/v1/workspaces/{workspace_id}/tasks/{task_id}`.
//! - `POST /api/v1/deployments` synthesizes a target specification, decides
//!   create-vs-update and applies it, synchronously.
//! - `/health`, `/ready` and `/metrics` for operations.

#![forbid(unsafe_code)]

pub mod api;
pub mod config;
pub mod services;

pub use api::{router, AppState};
pub use config::{ParallaxConfig, ServerConfig};
pub use services::AppServices;
