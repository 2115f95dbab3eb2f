use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::redaction::{RedactionClient, RedactionConfig, RedactionError};
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct TestServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_api_keys: Arc<Mutex<Vec<String>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_api_keys: Arc::new(Mutex::new(Vec::new())),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn returns_the_redacted_text() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({"redacted_text": "Contact [REDACTED] for access."}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = RedactionClient::new(config_for(url)).expect("client should build");
    let redacted = client
        .redact("Contact alice@example.com for access.")
        .await
        .expect("redaction should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(redacted, "Contact [REDACTED] for access.");

    let seen_api_keys = state.seen_api_keys.lock().await.clone();
    assert_eq!(seen_api_keys, vec!["test-redaction-key".to_string()]);

    let seen_bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(
        seen_bodies[0]["text"],
        "Contact alice@example.com for access."
    );
}

#[tokio::test]
async fn reply_without_redacted_text_is_rejected() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = RedactionClient::new(config_for(url)).expect("client should build");
    let err = client
        .redact("some text")
        .await
        .expect_err("missing redacted text should fail");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, RedactionError::InvalidRedactionPayload(ref message) if message == "missing_redacted_text"),
        "expected invalid payload error, got {err:?}"
    );
}

#[tokio::test]
async fn error_statuses_surface_as_service_failures() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({"message": "redactor offline"}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = RedactionClient::new(config_for(url)).expect("client should build");
    let err = client
        .redact("some text")
        .await
        .expect_err("error status should fail the redaction");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, RedactionError::ServiceFailure(ref message) if message.contains("status=500")),
        "expected service failure with status, got {err:?}"
    );
}

fn config_for(endpoint: String) -> RedactionConfig {
    RedactionConfig {
        endpoint,
        api_key: "test-redaction-key".to_string(),
        timeout_ms: 5_000,
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1/redact", post(test_redact_handler))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let local_addr = listener
        .local_addr()
        .expect("listener address should resolve");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let server_task = tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });

        server.await.expect("test server should run");
    });

    (format!("http://{local_addr}"), shutdown_tx, server_task)
}

async fn test_redact_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if let Some(value) = headers
        .get("api-key")
        .and_then(|header| header.to_str().ok())
    {
        state.seen_api_keys.lock().await.push(value.to_string());
    }

    state.seen_bodies.lock().await.push(payload);

    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({"error": "exhausted_test_replies"}),
    });

    (reply.status, Json(reply.body))
}
