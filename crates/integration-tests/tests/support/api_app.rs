#![allow(dead_code)]

use api_server::http::{AppState, build_router};
use shared::config::{ApiConfig, IndexSelection};
use shared::dispatch::{MailApiClient, MailApiConfig};
use shared::generate::{
    ChatCompletionsClient, ChatCompletionsConfig, ModelDialect, ModelInvokeClient,
    ModelInvokeConfig,
};
use shared::redaction::RedactionClient;
use shared::retrieval::{SearchIndexClient, SearchIndexConfig};

/// Nothing listens here; tests point only the upstreams they exercise at a
/// real mock server.
pub const DEAD_UPSTREAM_URL: &str = "http://127.0.0.1:65530";

pub const TEST_INDEX_ID: &str = "idx-test";

/// A full API config with every upstream parked on a dead endpoint. Tests
/// overwrite the endpoints they mock and tweak the selection knobs in place.
pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        index: IndexSelection {
            id: Some(TEST_INDEX_ID.to_string()),
            name: None,
        },
        guardrail_name: None,
        search: SearchIndexConfig {
            endpoint: DEAD_UPSTREAM_URL.to_string(),
            api_key: "test-search-key".to_string(),
            api_version: "2024-07-01".to_string(),
            query_page_size: 3,
            retrieve_page_size: 10,
            timeout_ms: 2_000,
        },
        model: ModelInvokeConfig {
            endpoint: DEAD_UPSTREAM_URL.to_string(),
            api_key: "test-model-key".to_string(),
            model_id: "test-model".to_string(),
            dialect: ModelDialect::Messages,
            guardrail_version: "DRAFT".to_string(),
            timeout_ms: 2_000,
        },
        chat: ChatCompletionsConfig {
            api_base: DEAD_UPSTREAM_URL.to_string(),
            api_key: Some("test-chat-key".to_string()),
            deployment: "test-deployment".to_string(),
            api_version: "2023-05-15".to_string(),
            timeout_ms: 2_000,
        },
        mail: MailApiConfig {
            endpoint: DEAD_UPSTREAM_URL.to_string(),
            api_key: "test-mail-key".to_string(),
            sender: "alerts@example.com".to_string(),
            recipient: "security-team@example.com".to_string(),
            subject: "Security finding report".to_string(),
            timeout_ms: 2_000,
        },
        redaction: None,
    }
}

pub fn build_test_router(config: ApiConfig) -> axum::Router {
    let state = AppState {
        document_index: SearchIndexClient::new(config.search.clone())
            .expect("search client should initialize"),
        model_client: ModelInvokeClient::new(config.model.clone())
            .expect("model client should initialize"),
        chat_client: ChatCompletionsClient::new(config.chat.clone())
            .expect("chat client should initialize"),
        mailer: MailApiClient::new(config.mail.clone()).expect("mail client should initialize"),
        redactor: config
            .redaction
            .clone()
            .map(RedactionClient::new)
            .transpose()
            .expect("redaction client should initialize"),
        config,
    };

    build_router(state)
}
