use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, Uri, header::AUTHORIZATION};
use axum::routing::{post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use shared::dispatch::{
    DeliveryError, MailApiClient, MailApiConfig, MailTransport, ObjectStore, ObjectStoreClient,
    ObjectStoreConfig, OutboundMail,
};
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
    seen_auth_headers: Arc<Mutex<Vec<String>>>,
    seen_mail_bodies: Arc<Mutex<Vec<Value>>>,
    seen_objects: Arc<Mutex<Vec<(String, String, String)>>>,
}

impl TestServerState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_auth_headers: Arc::new(Mutex::new(Vec::new())),
            seen_mail_bodies: Arc::new(Mutex::new(Vec::new())),
            seen_objects: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[tokio::test]
async fn mail_delivery_returns_the_receipt_message_id() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({"message_id": "msg-123"}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = MailApiClient::new(mail_config_for(url)).expect("client should build");
    let receipt = client
        .send(outbound_mail())
        .await
        .expect("delivery should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert_eq!(receipt.message_id, "msg-123");

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(seen_auth_headers, vec!["Bearer test-mail-key".to_string()]);

    let seen_mail_bodies = state.seen_mail_bodies.lock().await.clone();
    assert_eq!(seen_mail_bodies[0]["sender"], "sec-ops@example.com");
    assert_eq!(seen_mail_bodies[0]["recipient"], "oncall@example.com");
    assert_eq!(
        seen_mail_bodies[0]["subject"],
        "Nonconformant resource detected"
    );
    assert_eq!(seen_mail_bodies[0]["body"], "A public bucket was found.");
}

#[tokio::test]
async fn mail_error_statuses_surface_as_transport_failures() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::BAD_GATEWAY,
        body: json!({"message": "relay offline"}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = MailApiClient::new(mail_config_for(url)).expect("client should build");
    let err = client
        .send(outbound_mail())
        .await
        .expect_err("error status should fail the delivery");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, DeliveryError::TransportFailure(ref message) if message.contains("status=502")),
        "expected transport failure with status, got {err:?}"
    );
}

#[tokio::test]
async fn mail_reply_without_message_id_is_rejected() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = MailApiClient::new(mail_config_for(url)).expect("client should build");
    let err = client
        .send(outbound_mail())
        .await
        .expect_err("missing message id should fail the delivery");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, DeliveryError::InvalidTransportPayload(ref message) if message == "missing_message_id"),
        "expected invalid payload error, got {err:?}"
    );
}

#[tokio::test]
async fn object_put_writes_markdown_under_the_bucket_key() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::OK,
        body: json!({}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = ObjectStoreClient::new(store_config_for(url)).expect("client should build");
    client
        .put_object(
            "incident_report_f-1.md".to_string(),
            "# Incident Report".to_string(),
        )
        .await
        .expect("put should succeed");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    let seen_auth_headers = state.seen_auth_headers.lock().await.clone();
    assert_eq!(
        seen_auth_headers,
        vec!["Bearer test-storage-key".to_string()]
    );

    let seen_objects = state.seen_objects.lock().await.clone();
    assert_eq!(
        seen_objects,
        vec![(
            "/reports/incident_report_f-1.md".to_string(),
            "text/markdown".to_string(),
            "# Incident Report".to_string()
        )]
    );
}

#[tokio::test]
async fn object_put_error_statuses_surface_as_transport_failures() {
    let state = TestServerState::with_replies(vec![MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({"message": "store offline"}),
    }]);
    let (url, shutdown_tx, server_task) = spawn_test_server(state.clone()).await;

    let client = ObjectStoreClient::new(store_config_for(url)).expect("client should build");
    let err = client
        .put_object("incident_report_f-1.md".to_string(), "# Report".to_string())
        .await
        .expect_err("error status should fail the put");

    shutdown_tx.send(()).expect("shutdown signal should send");
    server_task.await.expect("server task should join");

    assert!(
        matches!(err, DeliveryError::TransportFailure(ref message) if message.contains("status=500")),
        "expected transport failure with status, got {err:?}"
    );
}

fn mail_config_for(endpoint: String) -> MailApiConfig {
    MailApiConfig {
        endpoint,
        api_key: "test-mail-key".to_string(),
        sender: "sec-ops@example.com".to_string(),
        recipient: "oncall@example.com".to_string(),
        subject: "Nonconformant resource detected".to_string(),
        timeout_ms: 5_000,
    }
}

fn store_config_for(endpoint: String) -> ObjectStoreConfig {
    ObjectStoreConfig {
        endpoint,
        api_key: "test-storage-key".to_string(),
        bucket: "reports".to_string(),
        timeout_ms: 5_000,
    }
}

fn outbound_mail() -> OutboundMail {
    OutboundMail {
        subject: "Nonconformant resource detected".to_string(),
        body: "A public bucket was found.".to_string(),
        sender: "sec-ops@example.com".to_string(),
        recipient: "oncall@example.com".to_string(),
    }
}

async fn spawn_test_server(
    state: TestServerState,
) -> (String, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/v1/messages", post(test_send_mail_handler))
        .route("/{bucket}/{key}", put(test_put_object_handler))
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

async fn test_send_mail_handler(
    State(state): State<TestServerState>,
    headers: HeaderMap,
    Json(payload): Json<Value>,
) -> (StatusCode, Json<Value>) {
    record_auth_header(&state, &headers).await;
    state.seen_mail_bodies.lock().await.push(payload);
    pop_reply(&state).await
}

async fn test_put_object_handler(
    State(state): State<TestServerState>,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    record_auth_header(&state, &headers).await;

    let content_type = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state
        .seen_objects
        .lock()
        .await
        .push((uri.path().to_string(), content_type, body));

    pop_reply(&state).await
}

async fn record_auth_header(state: &TestServerState, headers: &HeaderMap) {
    if let Some(value) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
    {
        state.seen_auth_headers.lock().await.push(value.to_string());
    }
}

async fn pop_reply(state: &TestServerState) -> (StatusCode, Json<Value>) {
    let reply = state.replies.lock().await.pop_front().unwrap_or(MockReply {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: json!({"error": "exhausted_test_replies"}),
    });

    (reply.status, Json(reply.body))
}
