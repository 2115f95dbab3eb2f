use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{GenerationFuture, GenerationResult, InvocationError, PromptEnvelope, TextGenerator};
use crate::config::ConfigError;
use crate::config_env::{optional_trimmed_env, parse_u64_env, require_http_endpoint_env};

const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";
const DEFAULT_API_VERSION: &str = "2023-05-15";
const DEFAULT_MAX_TOKENS: u32 = 150;
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone)]
pub struct ChatCompletionsConfig {
    pub api_base: String,
    /// No key configured means callers must supply one per request.
    pub api_key: Option<String>,
    pub deployment: String,
    pub api_version: String,
    pub timeout_ms: u64,
}

impl ChatCompletionsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: require_http_endpoint_env("CHAT_API_BASE")?,
            api_key: optional_trimmed_env("CHAT_API_KEY"),
            deployment: optional_trimmed_env("CHAT_DEPLOYMENT")
                .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            api_version: optional_trimmed_env("CHAT_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            timeout_ms: parse_u64_env("CHAT_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: ChatCompletionsConfig,
}

impl ChatCompletionsClient {
    pub fn new(config: ChatCompletionsConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn has_api_key(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Same client, different credential. Used when a caller supplies its own
    /// model key for a single request.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        let mut swapped = self.clone();
        swapped.config.api_key = Some(api_key.into());
        swapped
    }

    async fn complete(&self, envelope: &PromptEnvelope) -> Result<GenerationResult, InvocationError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(InvocationError::Unauthorized);
        };

        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.api_base, self.config.deployment, self.config.api_version
        );
        let request_body = json!({
            "messages": [
                { "role": "system", "content": envelope.system },
                { "role": "user", "content": envelope.user }
            ],
            "max_tokens": envelope.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        let response = self
            .client
            .post(&url)
            .header("api-key", api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    InvocationError::Timeout
                } else {
                    InvocationError::ServiceFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            InvocationError::InvalidModelPayload("response_body_read_failed".to_string())
        })?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(InvocationError::Unauthorized);
        }
        if !status.is_success() {
            return Err(InvocationError::ServiceFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: ChatCompletionsResponse = serde_json::from_str(&body).map_err(|_| {
            InvocationError::InvalidModelPayload("response_json_parse_failed".to_string())
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| InvocationError::InvalidModelPayload("missing_choice".to_string()))?;

        Ok(GenerationResult {
            model: parsed
                .model
                .unwrap_or_else(|| self.config.deployment.clone()),
            provider_request_id: parsed.id,
            text: content.trim().to_string(),
        })
    }
}

impl TextGenerator for ChatCompletionsClient {
    fn generate<'a>(&'a self, envelope: PromptEnvelope) -> GenerationFuture<'a> {
        Box::pin(async move { self.complete(&envelope).await })
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageBody,
}

#[derive(Debug, Deserialize)]
struct ChatMessageBody {
    content: String,
}
