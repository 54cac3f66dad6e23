use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admin::AdminState;
use crate::dispatch::{EnqueueRequest, JobSnapshot, QueueMetrics};
use crate::error::DispatchError;
use crate::subscription::SubscriptionResult;
use crate::telemetry::{HealthReport, TelemetryMetrics};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct QueueStatus {
    #[serde(flatten)]
    pub counts: QueueMetrics,
    pub paused: bool,
}

#[derive(Deserialize)]
pub struct CreateJobRequest {
    #[serde(flatten)]
    pub request: EnqueueRequest,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobResponse {
    pub job_id: String,
}

#[derive(Deserialize)]
pub struct TelemetryQuery {
    pub window_ms: Option<u64>,
}

#[derive(Serialize)]
pub struct VerifyResponse {
    pub subscribed: bool,
}

/// `DispatchError` rendered as a JSON error body.
pub struct AdminError(DispatchError);

impl From<DispatchError> for AdminError {
    fn from(err: DispatchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            DispatchError::InvalidRequest(_) | DispatchError::UnsupportedMessageType(_) => StatusCode::BAD_REQUEST,
            DispatchError::UnknownTenant(_) => StatusCode::NOT_FOUND,
            DispatchError::QueueClosed => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::RateLimit(_) => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub async fn get_status(State(state): State<AdminState>) -> Json<SystemStatus> {
    let queue = state.service.queue();
    let status = if queue.is_closed() {
        "closed"
    } else if queue.is_paused() {
        "paused"
    } else {
        "operational"
    };
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status,
    })
}

pub async fn get_queue(State(state): State<AdminState>) -> Json<QueueStatus> {
    let queue = state.service.queue();
    Json(QueueStatus {
        counts: queue.metrics(),
        paused: queue.is_paused(),
    })
}

pub async fn pause_queue(State(state): State<AdminState>) -> Json<serde_json::Value> {
    state.service.queue().pause();
    Json(json!({ "paused": true }))
}

pub async fn resume_queue(State(state): State<AdminState>) -> Json<serde_json::Value> {
    state.service.queue().resume();
    Json(json!({ "paused": false }))
}

pub async fn create_job(
    State(state): State<AdminState>,
    Json(body): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), AdminError> {
    let job_id = state.service.queue().enqueue(body.request, body.priority)?;
    Ok((StatusCode::ACCEPTED, Json(CreateJobResponse { job_id })))
}

pub async fn get_job(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<JobSnapshot>, StatusCode> {
    state.service.queue().job(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

pub async fn get_telemetry(
    State(state): State<AdminState>,
    Query(query): Query<TelemetryQuery>,
) -> Json<TelemetryMetrics> {
    let telemetry = state.service.telemetry();
    let window = query
        .window_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| telemetry.window());
    Json(telemetry.metrics(window))
}

pub async fn get_health(State(state): State<AdminState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.service.telemetry().health_status();
    let status = if report.healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report))
}

pub async fn subscribe_tenant(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionResult>, AdminError> {
    Ok(Json(state.service.subscribe_tenant(&id).await?))
}

pub async fn unsubscribe_tenant(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<SubscriptionResult>, AdminError> {
    Ok(Json(state.service.unsubscribe_tenant(&id).await?))
}

pub async fn verify_subscription(
    State(state): State<AdminState>,
    Path(id): Path<String>,
) -> Result<Json<VerifyResponse>, AdminError> {
    let subscribed = state.service.verify_tenant(&id).await?;
    Ok(Json(VerifyResponse { subscribed }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use tower::ServiceExt;

    use crate::admin::{setup_admin_router, AdminState};
    use crate::config::DispatchConfig;
    use crate::service::DispatchService;

    const KEY: &str = "test-admin-key";

    fn router() -> (Router, Arc<DispatchService>) {
        let service = Arc::new(DispatchService::from_config(&DispatchConfig::default()).unwrap());
        (setup_admin_router(AdminState::new(service.clone(), KEY)), service)
    }

    fn request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {}", KEY));
        match body {
            Some(body) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_rejects_missing_or_wrong_key() {
        let (app, _) = router();
        let response = app
            .clone()
            .oneshot(Request::builder().uri("/admin/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header("Authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_rotated_key_takes_effect() {
        let service = Arc::new(DispatchService::from_config(&DispatchConfig::default()).unwrap());
        let state = AdminState::new(service, KEY);
        let app = setup_admin_router(state.clone());

        state.set_api_key("rotated-key");
        let response = app
            .clone()
            .oneshot(request("GET", "/admin/status", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/admin/status")
                    .header("Authorization", "Bearer rotated-key")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_status() {
        let (app, _) = router();
        let response = app.oneshot(request("GET", "/admin/status", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "operational");
    }

    #[tokio::test]
    async fn test_enqueue_and_lookup_job() {
        let (app, service) = router();
        let body = r#"{"tenantId":"T1","recipient":"1555","message":{"type":"text","content":{"body":"hi"}},"priority":3}"#;
        let response = app
            .clone()
            .oneshot(request("POST", "/admin/jobs", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let job_id = json_body(response).await["jobId"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/admin/jobs/{}", job_id), None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let job = json_body(response).await;
        assert_eq!(job["state"], "waiting");
        assert_eq!(job["priority"], 3);

        let response = app.oneshot(request("GET", "/admin/queue", None)).await.unwrap();
        assert_eq!(json_body(response).await["waiting"], 1);
        assert_eq!(service.queue().metrics().waiting, 1);
    }

    #[tokio::test]
    async fn test_invalid_job_and_missing_job() {
        let (app, _) = router();
        let body = r#"{"tenantId":"","recipient":"1555","message":{"type":"text","content":{}}}"#;
        let response = app
            .clone()
            .oneshot(request("POST", "/admin/jobs", Some(body)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app.oneshot(request("GET", "/admin/jobs/nope", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_pause_and_resume() {
        let (app, service) = router();
        let response = app
            .clone()
            .oneshot(request("POST", "/admin/queue/pause", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(service.queue().is_paused());

        let response = app
            .clone()
            .oneshot(request("GET", "/admin/status", None))
            .await
            .unwrap();
        assert_eq!(json_body(response).await["status"], "paused");

        app.oneshot(request("POST", "/admin/queue/resume", None)).await.unwrap();
        assert!(!service.queue().is_paused());
    }

    #[tokio::test]
    async fn test_telemetry_and_health_on_empty_window() {
        let (app, _) = router();
        let response = app
            .clone()
            .oneshot(request("GET", "/admin/telemetry?window_ms=60000", None))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(body["totalCalls"], 0);
        assert_eq!(body["windowEnd"].as_u64().unwrap() - body["windowStart"].as_u64().unwrap(), 60_000);

        let response = app.oneshot(request("GET", "/admin/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["healthy"], true);
    }

    #[tokio::test]
    async fn test_subscription_for_unknown_tenant() {
        let (app, _) = router();
        let response = app
            .oneshot(request("POST", "/admin/tenants/T404/subscription", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
