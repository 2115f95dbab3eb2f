mod support;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use support::api_app::{build_test_router, test_config};

#[tokio::test]
async fn healthz_reports_ok() {
    let app = build_test_router(test_config());

    let response = app
        .clone()
        .oneshot(get_request("/healthz", None))
        .await
        .expect("request should succeed");

    assert_eq!(response.status(), StatusCode::OK);
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let body = serde_json::from_slice::<Value>(&body).unwrap_or_else(|_| json!({}));
    assert_eq!(body["ok"], true);
}

#[tokio::test]
async fn responses_echo_a_well_formed_caller_request_id() {
    let app = build_test_router(test_config());

    let response = app
        .clone()
        .oneshot(get_request("/healthz", Some("req-itest-7")))
        .await
        .expect("request should succeed");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(request_id_header(&response), Some("req-itest-7".to_string()));
}

#[tokio::test]
async fn missing_request_ids_are_generated() {
    let app = build_test_router(test_config());

    let response = app
        .clone()
        .oneshot(get_request("/healthz", None))
        .await
        .expect("request should succeed");

    let generated = request_id_header(&response).expect("generated request id");
    assert!(!generated.is_empty());
}

#[tokio::test]
async fn malformed_request_ids_are_replaced() {
    let app = build_test_router(test_config());
    let oversized = "x".repeat(300);

    let response = app
        .clone()
        .oneshot(get_request("/healthz", Some(&oversized)))
        .await
        .expect("request should succeed");

    let echoed = request_id_header(&response).expect("request id");
    assert_ne!(echoed, oversized);
    assert!(!echoed.is_empty());
}

fn get_request(uri: &str, request_id: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(request_id) = request_id {
        builder = builder.header("x-request-id", request_id);
    }
    builder.body(Body::empty()).expect("request should build")
}

fn request_id_header(response: &axum::response::Response) -> Option<String> {
    response
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}
