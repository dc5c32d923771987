//! Deployment endpoint.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use parallax_deploy::{synthesize, DeployError, DeployOutcome, DeployRequest, ServiceStatus};

use super::AppState;

/// Response for a deployment request.
///
/// The same shape is returned on success and on failure; `error` is null on
/// success and carries the failure message otherwise.
#[derive(Debug, Serialize)]
pub struct DeployResponse {
    /// Final workload name, when one was resolved.
    pub app_name: Option<String>,
    /// Target namespace.
    pub namespace: String,
    /// Name of the created service, when confirmed.
    pub service_name: Option<String>,
    /// Whether the service could be confirmed.
    pub service_status: String,
    /// Cluster-internal endpoint, when the service was confirmed.
    pub endpoint: Option<String>,
    /// Whether the workload autoscales.
    pub enable_autoscaling: bool,
    /// Whether the workload carries the spot hint.
    pub use_spot: bool,
    /// Failure message, null on success.
    pub error: Option<String>,
}

impl DeployResponse {
    fn success(outcome: DeployOutcome) -> Self {
        Self {
            app_name: Some(outcome.app_name),
            namespace: outcome.namespace,
            service_name: outcome.service_name,
            service_status: outcome.service_status.as_str().to_owned(),
            endpoint: outcome.endpoint,
            enable_autoscaling: outcome.enable_autoscaling,
            use_spot: outcome.use_spot,
            error: outcome.error,
        }
    }

    fn failure(request: &DeployRequest, error: &DeployError) -> Self {
        Self {
            app_name: request.app_name.clone(),
            namespace: request.namespace.clone(),
            service_name: None,
            service_status: ServiceStatus::NotFound.as_str().to_owned(),
            endpoint: None,
            enable_autoscaling: request.enable_autoscaling,
            use_spot: request.use_spot,
            error: Some(error.to_string()),
        }
    }
}

/// Synthesize, resolve and apply a deployment.
///
/// Deployment is synchronous: the response carries the final outcome, there
/// is no task to poll.
pub async fn deploy(
    State(state): State<AppState>,
    Json(request): Json<DeployRequest>,
) -> Result<Json<DeployResponse>, (StatusCode, Json<DeployResponse>)> {
    info!(
        namespace = %request.namespace,
        app_name = request.app_name.as_deref().unwrap_or("<generated>"),
        "deploying via API"
    );

    let spec = match synthesize(&request) {
        Ok(spec) => spec,
        Err(e) => return Err((error_to_status(&e), Json(DeployResponse::failure(&request, &e)))),
    };

    match state.resolver.resolve_and_apply(spec).await {
        Ok(outcome) => {
            info!(app_name = %outcome.app_name, "deployment applied");
            Ok(Json(DeployResponse::success(outcome)))
        }
        Err(e) => Err((error_to_status(&e), Json(DeployResponse::failure(&request, &e)))),
    }
}

const fn error_to_status(error: &DeployError) -> StatusCode {
    match error {
        DeployError::Validation(_) | DeployError::ScalingConflict(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::super::{router, test_support};

    fn deploy_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/deployments")
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
    async fn deploy_with_generated_name() {
        let app = router(test_support::make_state());

        let response = app
            .oneshot(deploy_request(serde_json::json!({
                "namespace": "default",
                "image_ref": "registry.local/apps:abc123",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        let app_name = body["app_name"].as_str().unwrap();
        assert!(app_name.starts_with("plx-"));
        assert_eq!(body["service_status"], "found");
        assert_eq!(
            body["endpoint"],
            format!("{app_name}.default.svc.cluster.local")
        );
        assert!(body["error"].is_null());
    }

    #[tokio::test]
    async fn deploy_rejects_ambiguous_scaling() {
        let app = router(test_support::make_state());

        let response = app
            .oneshot(deploy_request(serde_json::json!({
                "namespace": "default",
                "image_ref": "registry.local/apps:abc123",
                "enable_autoscaling": true,
                "replicas": 5,
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = response_json(response).await;
        assert!(body["error"]
            .as_str()
            .unwrap()
            .contains("conflicting scaling intent"));
    }

    #[tokio::test]
    async fn deploy_rejects_missing_namespace() {
        let app = router(test_support::make_state());

        let response = app
            .oneshot(deploy_request(serde_json::json!({
                "namespace": "",
                "image_ref": "registry.local/apps:abc123",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn second_deploy_with_same_name_is_update() {
        let state = test_support::make_state();

        let app = router(state.clone());
        let response = app
            .oneshot(deploy_request(serde_json::json!({
                "namespace": "default",
                "image_ref": "registry.local/apps:v1",
                "app_name": "fn-a",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let app = router(state);
        let response = app
            .oneshot(deploy_request(serde_json::json!({
                "namespace": "default",
                "image_ref": "registry.local/apps:v2",
                "app_name": "fn-a",
            })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response_json(response).await;
        assert_eq!(body["app_name"], "fn-a");
        assert_eq!(body["service_status"], "found");
    }
}
