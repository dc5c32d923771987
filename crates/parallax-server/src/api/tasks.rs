//! Pipeline task endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use parallax_pipeline::{PipelineError, TaskError, TaskId, TaskRecord, TaskResult, WorkspaceId};

use super::AppState;

/// Request to submit a pipeline task.
#[derive(Debug, Deserialize)]
pub struct SubmitTaskRequest {
    /// Workspace the task belongs to.
    pub workspace_id: String,
    /// Reference to the uploaded source artifact.
    pub source_ref: String,
}

/// Response for a submitted task.
#[derive(Debug, Serialize)]
pub struct SubmitTaskResponse {
    /// The assigned task ID.
    pub task_id: String,
    /// Initial status, always `pending`.
    pub status: String,
}

/// Response for a task status query.
#[derive(Debug, Serialize)]
pub struct TaskStatusResponse {
    /// Task ID.
    pub task_id: String,
    /// Current status.
    pub status: String,
    /// Pipeline result, present once the task is done.
    pub result: Option<TaskResult>,
    /// Failure details, present once the task has failed.
    pub error: Option<TaskError>,
}

/// Item in a workspace task listing.
#[derive(Debug, Serialize)]
pub struct TaskListItem {
    /// Task ID.
    pub task_id: String,
    /// Current status.
    pub status: String,
    /// Source the task was submitted with.
    pub source_ref: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
    /// Pipeline result, present once the task is done.
    pub result: Option<TaskResult>,
    /// Failure details, present once the task has failed.
    pub error: Option<TaskError>,
}

/// Response for a workspace task listing.
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    /// The workspace that was queried.
    pub workspace_id: String,
    /// Task records, newest first.
    pub tasks: Vec<TaskListItem>,
    /// Number of tasks returned.
    pub count: usize,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message.
    pub error: String,
}

/// Submit a new pipeline task.
pub async fn submit_task(
    State(state): State<AppState>,
    Json(request): Json<SubmitTaskRequest>,
) -> Result<(StatusCode, Json<SubmitTaskResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!(workspace = %request.workspace_id, "submitting task via API");

    match state
        .orchestrator
        .submit(WorkspaceId::new(&request.workspace_id), request.source_ref)
        .await
    {
        Ok(task_id) => Ok((
            StatusCode::ACCEPTED,
            Json(SubmitTaskResponse {
                task_id: task_id.to_string(),
                status: "pending".to_owned(),
            }),
        )),
        Err(e) => Err(error_response(&e)),
    }
}

/// Get the status of a task, scoped to its workspace.
pub async fn get_task_status(
    State(state): State<AppState>,
    Path((workspace_id, task_id)): Path<(String, String)>,
) -> Result<Json<TaskStatusResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .orchestrator
        .get_status(&WorkspaceId::new(&workspace_id), &TaskId::new(&task_id))
        .await
    {
        Ok(record) => Ok(Json(TaskStatusResponse {
            task_id: record.data.id.to_string(),
            status: record.status.as_str().to_owned(),
            result: record.data.result,
            error: record.data.error,
        })),
        Err(e) => Err(error_response(&e)),
    }
}

/// List all tasks for a workspace, newest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    Path(workspace_id): Path<String>,
) -> Result<Json<TaskListResponse>, (StatusCode, Json<ErrorResponse>)> {
    match state
        .orchestrator
        .list_for_workspace(&WorkspaceId::new(&workspace_id))
        .await
    {
        Ok(records) => {
            let tasks: Vec<TaskListItem> = records.into_iter().map(record_to_item).collect();
            let count = tasks.len();
            Ok(Json(TaskListResponse {
                workspace_id,
                tasks,
                count,
            }))
        }
        Err(e) => Err(error_response(&e)),
    }
}

fn record_to_item(record: TaskRecord) -> TaskListItem {
    TaskListItem {
        task_id: record.data.id.to_string(),
        status: record.status.as_str().to_owned(),
        source_ref: record.data.source_ref,
        created_at: record.data.created_at.to_rfc3339(),
        updated_at: record.data.updated_at.to_rfc3339(),
        result: record.data.result,
        error: record.data.error,
    }
}

fn error_response(error: &PipelineError) -> (StatusCode, Json<ErrorResponse>) {
    (
        error_to_status(error),
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
}

const fn error_to_status(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::Validation(_) => StatusCode::BAD_REQUEST,
        PipelineError::TaskNotFound { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::super::{router, test_support};

    fn submit_request(workspace_id: &str) -> Request<Body> {
        let body = serde_json::json!({
            "workspace_id": workspace_id,
            "source_ref": "mem://sources/app.zip",
        });
        Request::builder()
            .method("POST")
            .uri("/api/v1/tasks")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn response_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("parse body")
    }

    #[tokio::test]
    async fn submit_returns_accepted_with_pending_status() {
        let state = test_support::make_state();
        let app = router(state);

        let response = app.oneshot(submit_request("ws1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);

        let body = response_json(response).await;
        assert_eq!(body["status"], "pending");
        assert!(!body["task_id"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_rejects_empty_workspace() {
        let state = test_support::make_state();
        let app = router(state);

        let response = app.oneshot(submit_request("")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn status_is_workspace_scoped() {
        let state = test_support::make_state();
        let app = router(state.clone());

        let response = app.oneshot(submit_request("ws1")).await.unwrap();
        let body = response_json(response).await;
        let task_id = body["task_id"].as_str().unwrap().to_owned();

        let app = router(state.clone());
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/workspaces/ws1/tasks/{task_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/v1/workspaces/ws2/tasks/{task_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn polling_observes_completion() {
        let state = test_support::make_state();
        state.orchestrator.start().await;

        let app = router(state.clone());
        let response = app.oneshot(submit_request("ws1")).await.unwrap();
        let body = response_json(response).await;
        let task_id = body["task_id"].as_str().unwrap().to_owned();

        let mut last_status = String::new();
        for _ in 0..200 {
            let app = router(state.clone());
            let response = app
                .oneshot(
                    Request::builder()
                        .uri(format!("/api/v1/workspaces/ws1/tasks/{task_id}"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            let body = response_json(response).await;
            last_status = body["status"].as_str().unwrap().to_owned();
            if last_status == "done" {
                assert!(body["result"]["image_ref"].as_str().unwrap().len() > 0);
                assert!(body["error"].is_null());
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(last_status, "done");

        state.orchestrator.shutdown().await;
    }

    #[tokio::test]
    async fn list_returns_workspace_tasks() {
        let state = test_support::make_state();

        let app = router(state.clone());
        app.oneshot(submit_request("ws1")).await.unwrap();
        let app = router(state.clone());
        app.oneshot(submit_request("ws1")).await.unwrap();
        let app = router(state.clone());
        app.oneshot(submit_request("ws2")).await.unwrap();

        let app = router(state);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/workspaces/ws1/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["workspace_id"], "ws1");
        assert_eq!(body["count"], 2);
        assert_eq!(body["tasks"].as_array().unwrap().len(), 2);
    }
}
