use axum::routing::{get, post};
use axum::{Router, middleware};
use shared::config::ApiConfig;
use shared::dispatch::MailApiClient;
use shared::generate::{ChatCompletionsClient, ModelInvokeClient};
use shared::redaction::RedactionClient;
use shared::retrieval::SearchIndexClient;

mod answer;
mod chat;
mod errors;
mod health;
mod observability;
mod report;

#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub document_index: SearchIndexClient,
    pub model_client: ModelInvokeClient,
    pub chat_client: ChatCompletionsClient,
    pub mailer: MailApiClient,
    pub redactor: Option<RedactionClient>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(health::healthz))
        .route("/v1/findings/report", post(report::report_finding))
        .route("/v1/chat/turn", post(chat::chat_turn))
        .route("/v1/answer", post(answer::answer_query))
        .layer(middleware::from_fn(
            observability::request_observability_middleware,
        ))
        .with_state(app_state)
}
