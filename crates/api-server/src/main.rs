use std::net::SocketAddr;

use shared::config::{ApiConfig, ConfigError, load_dotenv};
use shared::dispatch::MailApiClient;
use shared::generate::{ChatCompletionsClient, ModelInvokeClient};
use shared::redaction::RedactionClient;
use shared::retrieval::SearchIndexClient;
use tracing::{error, info};

mod http;

#[tokio::main]
async fn main() {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "api_server=debug,axum=info,tower_http=info".to_string()),
        )
        .init();

    let config = match ApiConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let app_state = match build_state(config) {
        Ok(app_state) => app_state,
        Err(err) => {
            error!("failed to build upstream clients: {err}");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = app_state
        .config
        .bind_addr
        .parse()
        .unwrap_or_else(|_| "127.0.0.1:8080".parse().expect("valid default bind addr"));

    let app = http::build_router(app_state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind should succeed");

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    axum::serve(listener, app).await.expect("server should run");
}

fn build_state(config: ApiConfig) -> Result<http::AppState, ConfigError> {
    Ok(http::AppState {
        document_index: SearchIndexClient::new(config.search.clone())?,
        model_client: ModelInvokeClient::new(config.model.clone())?,
        chat_client: ChatCompletionsClient::new(config.chat.clone())?,
        mailer: MailApiClient::new(config.mail.clone())?,
        redactor: config
            .redaction
            .clone()
            .map(RedactionClient::new)
            .transpose()?,
        config,
    })
}
