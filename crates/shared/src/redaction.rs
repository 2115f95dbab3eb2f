use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::config_env::{ensure_http_endpoint, optional_trimmed_env, parse_u64_env};

const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Error)]
pub enum RedactionError {
    #[error("redaction request timed out")]
    Timeout,
    #[error("redaction request failed: {0}")]
    ServiceFailure(String),
    #[error("redaction service returned an invalid payload: {0}")]
    InvalidRedactionPayload(String),
}

#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub endpoint: String,
    pub api_key: String,
    pub timeout_ms: u64,
}

impl RedactionConfig {
    /// Redaction is opt-in: absent entirely when neither variable is set,
    /// rejected when only one of them is.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let endpoint = optional_trimmed_env("REDACTION_ENDPOINT");
        let api_key = optional_trimmed_env("REDACTION_API_KEY");

        match (endpoint, api_key) {
            (None, None) => Ok(None),
            (Some(endpoint), Some(api_key)) => Ok(Some(Self {
                endpoint: ensure_http_endpoint("REDACTION_ENDPOINT", endpoint)?,
                api_key,
                timeout_ms: parse_u64_env("REDACTION_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
            })),
            _ => Err(ConfigError::InvalidConfiguration(
                "REDACTION_ENDPOINT and REDACTION_API_KEY must be set together".to_string(),
            )),
        }
    }
}

#[derive(Clone)]
pub struct RedactionClient {
    client: reqwest::Client,
    config: RedactionConfig,
}

impl RedactionClient {
    pub fn new(config: RedactionConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub async fn redact(&self, text: &str) -> Result<String, RedactionError> {
        let url = format!("{}/v1/redact", self.config.endpoint);
        let request_body = json!({"text": text});

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RedactionError::Timeout
                } else {
                    RedactionError::ServiceFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            RedactionError::InvalidRedactionPayload("response_body_read_failed".to_string())
        })?;
        if !status.is_success() {
            return Err(RedactionError::ServiceFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: RedactResponse = serde_json::from_str(&body).map_err(|_| {
            RedactionError::InvalidRedactionPayload("response_json_parse_failed".to_string())
        })?;
        parsed.redacted_text.ok_or_else(|| {
            RedactionError::InvalidRedactionPayload("missing_redacted_text".to_string())
        })
    }
}

#[derive(Debug, Deserialize)]
struct RedactResponse {
    #[serde(default)]
    redacted_text: Option<String>,
}
