//! API routes and the error type shared by every handler.

pub mod grade;
pub mod health;
pub mod run;

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use workerlab_core::error::HarnessError;

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/run", post(run::run_submission))
        .route("/api/run", post(run::run_submission))
        .route("/grade", post(grade::grade_submission))
        .route("/health", get(health::health_check))
        .with_state(state)
}

/// Harness-level failure, rendered as `{"error": message}`.
///
/// Failures of the submitted code never reach this type; they travel as
/// data inside a successful response.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<HarnessError> for ApiError {
    fn from(err: HarnessError) -> Self {
        match err {
            HarnessError::InvalidSubmission(_) => ApiError::BadRequest(err.to_string()),
            HarnessError::ProvisionFailed(_) => {
                tracing::error!("{err}");
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::Value;
    use tower::ServiceExt;

    use workerlab_core::coordinator::{RunConfig, RunCoordinator};
    use workerlab_core::error::EntrypointError;
    use workerlab_core::mock::{MockBehavior, MockSubstrate};
    use workerlab_core::traits::EntrypointResponse;

    fn router(substrate: MockSubstrate) -> Router {
        let coordinator = RunCoordinator::new(Arc::new(substrate), RunConfig::default());
        create_router(AppState::new(coordinator))
    }

    async fn send(router: Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn run_returns_outcome() {
        let app = router(MockSubstrate::new(MockBehavior::respond(200, "Hello World!")));
        let (status, body) = send(
            app,
            "POST",
            "/run",
            json!({ "code": "export default {}", "testRequest": { "path": "/" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 200);
        assert_eq!(body["body"], "Hello World!");
        assert!(body["duration"].is_u64());
    }

    #[tokio::test]
    async fn thrown_error_is_a_200_with_synthetic_status() {
        let app = router(MockSubstrate::new(MockBehavior::Throw("boom".into())));
        let (status, body) = send(
            app,
            "POST",
            "/api/run",
            json!({ "code": "export default {}", "testRequest": { "path": "/" } }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], 500);
        assert_eq!(body["body"], "Error: boom");
    }

    #[tokio::test]
    async fn empty_code_is_a_400() {
        let app = router(MockSubstrate::new(MockBehavior::respond(200, "ok")));
        let (status, body) = send(
            app,
            "POST",
            "/run",
            json!({ "code": "", "testRequest": { "path": "/" } }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("non-empty"));
    }

    #[tokio::test]
    async fn malformed_payload_is_a_400() {
        let app = router(MockSubstrate::new(MockBehavior::respond(200, "ok")));
        let (status, body) = send(app, "POST", "/run", json!({ "code": 42 })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn provision_failure_is_a_500() {
        let substrate =
            MockSubstrate::new(MockBehavior::respond(200, "ok")).failing_loads(2, false);
        let (status, body) = send(
            router(substrate),
            "POST",
            "/run",
            json!({ "code": "export default {}", "testRequest": { "path": "/" } }),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("provision"));
    }

    #[tokio::test]
    async fn grade_reports_every_verdict_in_order() {
        let substrate = MockSubstrate::new(MockBehavior::handler(|req| {
            if req.url.ends_with("/fail") {
                return Err(EntrypointError::new("Error: nope"));
            }
            Ok(EntrypointResponse {
                status: 200,
                body: "ok".into(),
            })
        }));
        let (status, body) = send(
            router(substrate),
            "POST",
            "/grade",
            json!({
                "code": "export default {}",
                "tests": [
                    { "name": "first", "request": { "path": "/" }, "expectation": { "bodyEquals": "ok" } },
                    { "name": "second", "request": { "path": "/fail" }, "expectation": { "status": 200 } },
                    { "name": "third", "request": { "path": "/" }, "expect": { "status": 200 } }
                ]
            }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["passed"], false);
        let verdicts = body["verdicts"].as_array().unwrap();
        let names: Vec<&str> = verdicts
            .iter()
            .map(|v| v["testName"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert_eq!(verdicts[1]["passed"], false);
        assert!(verdicts[1]["reason"].as_str().unwrap().contains("nope"));
        assert_eq!(verdicts[2]["passed"], true);
    }

    #[tokio::test]
    async fn health_names_the_substrate() {
        let app = router(MockSubstrate::new(MockBehavior::respond(200, "ok")));
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["substrate"], "mock");
    }
}
