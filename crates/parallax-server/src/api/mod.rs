//! HTTP API for the Parallax service.
//!
//! Provides endpoints for:
//! - Task submission and polling (the pipeline surface)
//! - Deployments (synthesize + resolve + apply)
//! - Health and readiness checks
//! - Prometheus metrics

mod deployments;
mod tasks;

use std::fmt::Write as _;
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use parallax_deploy::DeploymentResolver;
use parallax_pipeline::TaskOrchestrator;

pub use deployments::DeployResponse;
pub use tasks::{
    SubmitTaskRequest, SubmitTaskResponse, TaskListItem, TaskListResponse, TaskStatusResponse,
};

/// Shared application state for the API.
#[derive(Clone)]
pub struct AppState {
    /// Task orchestrator.
    pub orchestrator: Arc<TaskOrchestrator>,
    /// Deployment resolver.
    pub resolver: Arc<DeploymentResolver>,
}

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Pipeline tasks
        .route("/api/v1/tasks", post(tasks::submit_task))
        .route(
            "/api/v1/workspaces/{workspace_id}/tasks",
            get(tasks::list_tasks),
        )
        .route(
            "/api/v1/workspaces/{workspace_id}/tasks/{task_id}",
            get(tasks::get_task_status),
        )
        // Deployments
        .route("/api/v1/deployments", post(deployments::deploy))
        // Metrics
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> axum::Json<HealthResponse> {
    axum::Json(HealthResponse { status: "healthy" })
}

/// Readiness check endpoint.
async fn readiness_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> axum::Json<ReadyResponse> {
    axum::Json(ReadyResponse {
        ready: true,
        pending_tasks: state.orchestrator.pending_count().await,
        in_flight_tasks: state.orchestrator.in_flight_count(),
    })
}

/// Metrics endpoint.
async fn metrics(axum::extract::State(state): axum::extract::State<AppState>) -> String {
    let mut output = String::new();

    output.push_str("# HELP parallax_tasks_pending Number of tasks waiting for a worker\n");
    output.push_str("# TYPE parallax_tasks_pending gauge\n");
    let _ = writeln!(
        output,
        "parallax_tasks_pending {}",
        state.orchestrator.pending_count().await
    );

    output.push_str("# HELP parallax_tasks_in_flight Number of tasks currently executing\n");
    output.push_str("# TYPE parallax_tasks_in_flight gauge\n");
    let _ = writeln!(
        output,
        "parallax_tasks_in_flight {}",
        state.orchestrator.in_flight_count()
    );

    output
}

/// Health response.
#[derive(serde::Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Readiness response.
#[derive(serde::Serialize)]
struct ReadyResponse {
    ready: bool,
    pending_tasks: usize,
    in_flight_tasks: usize,
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ParallaxConfig;
    use crate::services::AppServices;

    pub fn make_state() -> AppState {
        let services = AppServices::in_memory(&ParallaxConfig::default());
        AppState {
            orchestrator: services.orchestrator,
            resolver: services.resolver,
        }
    }
}
