use std::env;

use thiserror::Error;

use crate::config_env::optional_trimmed_env;
use crate::dispatch::{MailApiConfig, ObjectStoreConfig};
use crate::findings::FindingsConfig;
use crate::generate::{ChatCompletionsConfig, ModelInvokeConfig};
use crate::redaction::RedactionConfig;
use crate::retrieval::SearchIndexConfig;

pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required env var {0}")]
    MissingVar(String),
    #[error("invalid integer in env var {0}")]
    ParseInt(String),
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("failed to build http client: {0}")]
    HttpClient(String),
}

/// Which document index the pipelines read from. At least one of the two
/// selectors must be present; an explicit id skips the lookup round trip.
#[derive(Debug, Clone)]
pub struct IndexSelection {
    pub id: Option<String>,
    pub name: Option<String>,
}

impl IndexSelection {
    pub fn from_env() -> Result<Self, ConfigError> {
        let selection = Self {
            id: optional_trimmed_env("SEARCH_INDEX_ID"),
            name: optional_trimmed_env("SEARCH_INDEX_NAME"),
        };
        if selection.id.is_none() && selection.name.is_none() {
            return Err(ConfigError::InvalidConfiguration(
                "SEARCH_INDEX_ID or SEARCH_INDEX_NAME must be set".to_string(),
            ));
        }
        Ok(selection)
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: String,
    pub index: IndexSelection,
    pub guardrail_name: Option<String>,
    pub search: SearchIndexConfig,
    pub model: ModelInvokeConfig,
    pub chat: ChatCompletionsConfig,
    pub mail: MailApiConfig,
    pub redaction: Option<RedactionConfig>,
}

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub tick_seconds: u64,
    pub index: IndexSelection,
    pub findings: FindingsConfig,
    pub search: SearchIndexConfig,
    pub model: ModelInvokeConfig,
    pub store: ObjectStoreConfig,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            index: IndexSelection::from_env()?,
            guardrail_name: optional_trimmed_env("GUARDRAIL_NAME"),
            search: SearchIndexConfig::from_env()?,
            model: ModelInvokeConfig::from_env()?,
            chat: ChatCompletionsConfig::from_env()?,
            mail: MailApiConfig::from_env()?,
            redaction: RedactionConfig::from_env()?,
        })
    }
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let tick_seconds = match env::var("WORKER_TICK_SECONDS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map_err(|_| ConfigError::ParseInt("WORKER_TICK_SECONDS".to_string()))?,
            Err(_) => 300,
        };

        Ok(Self {
            tick_seconds,
            index: IndexSelection::from_env()?,
            findings: FindingsConfig::from_env()?,
            search: SearchIndexConfig::from_env()?,
            model: ModelInvokeConfig::from_env()?,
            store: ObjectStoreConfig::from_env()?,
        })
    }
}
