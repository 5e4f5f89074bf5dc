//! HTTP surface of the `node-reaper` service.
//!
//! # Routes
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check
//! - `POST /v1/decommission` - Decommission the node backing `{"instance_id": ...}`
//! - `POST /v1/notifications` - Handle an SNS-delivered autoscaling notification
//!
//! Decommission responses carry a [`DecommissionResult`] and use its
//! `status_code` as the HTTP status.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::event::{self, DirectRequest, Notification};
use crate::types::{DecommissionRequest, DecommissionResult};
use crate::workflow::DecommissionWorkflow;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    workflow: Arc<DecommissionWorkflow>,
    max_body_bytes: usize,
}

impl AppState {
    /// Create state around a workflow, accepting request bodies up to
    /// `max_body_bytes`.
    #[must_use]
    pub const fn new(workflow: Arc<DecommissionWorkflow>, max_body_bytes: usize) -> Self {
        Self {
            workflow,
            max_body_bytes,
        }
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

/// Reply to an event that did not start a run.
#[derive(Debug, Serialize)]
struct Acknowledged {
    status: &'static str,
    reason: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Create the service router with request tracing, a body size limit, and
/// panic recovery.
pub fn create_router(state: AppState) -> Router {
    let max_body_bytes = state.max_body_bytes;

    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/v1/decommission", post(decommission))
        .route("/v1/notifications", post(notification))
        .with_state(state)
        .layer(CatchPanicLayer::new())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        service: "node-reaper",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ready() -> impl IntoResponse {
    (StatusCode::OK, "ready")
}

async fn decommission(
    State(state): State<AppState>,
    Json(body): Json<DirectRequest>,
) -> Response {
    let request = DecommissionRequest::new(body.instance_id);
    result_response(state.workflow.decommission(request).await)
}

async fn notification(State(state): State<AppState>, Json(payload): Json<Value>) -> Response {
    match event::parse_notification(payload) {
        Ok(Notification::Terminate(instance_id)) => {
            let request = DecommissionRequest::new(instance_id);
            result_response(state.workflow.decommission(request).await)
        }
        Ok(Notification::Test) => {
            info!("Received test notification");
            acknowledge("test notification")
        }
        Ok(Notification::Ignored(name)) => {
            info!(event = %name, "Ignoring non-termination event");
            acknowledge(format!("event {name} does not trigger decommission"))
        }
        Err(e) => {
            warn!(error = %e, "Rejected notification");
            let status =
                StatusCode::from_u16(e.http_status_code()).unwrap_or(StatusCode::BAD_REQUEST);
            (status, Json(ErrorResponse { error: e.to_string() })).into_response()
        }
    }
}

fn acknowledge(reason: impl Into<String>) -> Response {
    Json(Acknowledged {
        status: "ignored",
        reason: reason.into(),
    })
    .into_response()
}

fn result_response(result: DecommissionResult) -> Response {
    let status =
        StatusCode::from_u16(result.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(result)).into_response()
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use node_reaper_cluster::MockClusterControl;
    use node_reaper_core::InstanceId;
    use node_reaper_credentials::StaticCredentialProvider;
    use node_reaper_inventory::StaticInventory;
    use serde_json::json;
    use tower::ServiceExt;

    use super::*;
    use crate::config::WorkflowConfig;

    struct Fixture {
        state: AppState,
        cluster: Arc<MockClusterControl>,
        _dir: tempfile::TempDir,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let cluster = Arc::new(MockClusterControl::new().with_node("node-abc"));
        let workflow = DecommissionWorkflow::new(
            Arc::new(StaticInventory::new().with_node("i-0abc123", "node-abc")),
            Arc::new(StaticCredentialProvider::default()),
            cluster.clone(),
            WorkflowConfig {
                credential_dir: Some(dir.path().to_path_buf()),
                ..WorkflowConfig::default()
            },
        );
        Fixture {
            state: AppState::new(Arc::new(workflow), 1024),
            cluster,
            _dir: dir,
        }
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn sns(message: &Value) -> Value {
        json!({ "Records": [{ "Sns": { "Message": message.to_string() } }] })
    }

    #[tokio::test]
    async fn health_returns_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn decommission_success_is_200() {
        let f = fixture();
        let body = DirectRequest {
            instance_id: InstanceId::new("i-0abc123").unwrap(),
        };

        let response = decommission(State(f.state.clone()), Json(body)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "success");
        assert_eq!(json["node_name"], "node-abc");
        assert!(!f.cluster.is_registered("node-abc"));
    }

    #[tokio::test]
    async fn decommission_failure_is_500() {
        let f = fixture();
        let body = DirectRequest {
            instance_id: InstanceId::new("i-999").unwrap(),
        };

        let response = decommission(State(f.state.clone()), Json(body)).await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["status"], "failure");
        assert_eq!(json["status_code"], 500);
        assert_eq!(json["detail"]["kind"], "resolution");
    }

    #[tokio::test]
    async fn sns_termination_runs_workflow() {
        let f = fixture();
        let payload = sns(&json!({
            "Event": "autoscaling:EC2_INSTANCE_TERMINATE",
            "EC2InstanceId": "i-0abc123",
        }));

        let response = notification(State(f.state.clone()), Json(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(f.cluster.removals().len(), 1);
    }

    #[tokio::test]
    async fn test_notification_is_acknowledged() {
        let f = fixture();
        let payload = sns(&json!({ "Event": "autoscaling:TEST_NOTIFICATION" }));

        let response = notification(State(f.state.clone()), Json(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["status"], "ignored");
        assert!(f.cluster.evacuations().is_empty());
    }

    #[tokio::test]
    async fn malformed_notification_is_400() {
        let f = fixture();

        let response = notification(State(f.state.clone()), Json(json!({ "Records": [] }))).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(response).await["error"]
            .as_str()
            .unwrap()
            .contains("no records"));
    }

    #[tokio::test]
    async fn router_serves_health() {
        let f = fixture();
        let app = create_router(f.state.clone());

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["service"], "node-reaper");
    }

    #[tokio::test]
    async fn router_decommissions_through_layers() {
        let f = fixture();
        let app = create_router(f.state.clone());

        let response = app
            .oneshot(
                Request::post("/v1/decommission")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "instance_id": "i-0abc123" }).to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!f.cluster.is_registered("node-abc"));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected_before_workflow() {
        let f = fixture();
        let app = create_router(f.state.clone());
        let body = json!({ "instance_id": "i-0abc123", "padding": "x".repeat(2048) }).to_string();

        let response = app
            .oneshot(
                Request::post("/v1/decommission")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::CONTENT_LENGTH, body.len())
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(f.cluster.evacuations().is_empty());
        assert!(f.cluster.is_registered("node-abc"));
    }
}
