use std::sync::Arc;

use shared::config::{ConfigError, WorkerConfig, load_dotenv};
use shared::dispatch::ObjectStoreClient;
use shared::findings::FindingsClient;
use shared::generate::ModelInvokeClient;
use shared::retrieval::SearchIndexClient;
use tokio::signal;
use tokio::time::{self, Duration};
use tracing::{error, info};

mod sweep;

#[tokio::main]
async fn main() {
    load_dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "worker=debug".to_string()))
        .init();

    let config = match WorkerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read worker config: {err}");
            std::process::exit(1);
        }
    };
    let tick_seconds = config.tick_seconds;

    let context = match build_context(config) {
        Ok(context) => context,
        Err(err) => {
            error!("failed to build upstream clients: {err}");
            std::process::exit(1);
        }
    };

    info!("worker starting (tick every {tick_seconds} seconds)");

    let mut ticker = time::interval(Duration::from_secs(tick_seconds));

    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                sweep::run_findings_sweep(&context).await;
            }
        }
    }
}

fn build_context(config: WorkerConfig) -> Result<sweep::SweepContext, ConfigError> {
    Ok(sweep::SweepContext {
        findings: Arc::new(FindingsClient::new(config.findings)?),
        index: Arc::new(SearchIndexClient::new(config.search)?),
        generator: Arc::new(ModelInvokeClient::new(config.model)?),
        store: Arc::new(ObjectStoreClient::new(config.store)?),
        selection: config.index,
    })
}
