use std::str::FromStr;
use std::time::Duration;

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;

use super::{
    GenerationFuture, GenerationResult, GuardrailCatalog, GuardrailLookupFuture, InvocationError,
    PromptEnvelope, TextGenerator,
};
use crate::config::ConfigError;
use crate::config_env::{
    optional_trimmed_env, parse_u64_env, require_http_endpoint_env, require_non_empty_env,
};

pub const GUARDRAIL_IDENTIFIER_HEADER: &str = "x-guardrail-identifier";
pub const GUARDRAIL_VERSION_HEADER: &str = "x-guardrail-version";

const DEFAULT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_GUARDRAIL_VERSION: &str = "DRAFT";

const MESSAGES_SCHEMA_VERSION: &str = "bedrock-2023-05-31";
const DEFAULT_MESSAGES_MODEL_ID: &str = "anthropic.claude-3-haiku-20240307-v1:0";
const DEFAULT_MESSAGES_MAX_TOKENS: u32 = 9186;
const DEFAULT_PLAIN_TEXT_MODEL_ID: &str = "amazon.titan-text-lite-v1";
const DEFAULT_PLAIN_TEXT_MAX_TOKENS: u32 = 4096;

/// Request and response shape spoken by the configured model id. Messages
/// models take a system prompt plus structured user turns; plain-text models
/// take a single concatenated prompt string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDialect {
    Messages,
    PlainText,
}

impl ModelDialect {
    fn default_model_id(self) -> &'static str {
        match self {
            ModelDialect::Messages => DEFAULT_MESSAGES_MODEL_ID,
            ModelDialect::PlainText => DEFAULT_PLAIN_TEXT_MODEL_ID,
        }
    }

    fn default_max_tokens(self) -> u32 {
        match self {
            ModelDialect::Messages => DEFAULT_MESSAGES_MAX_TOKENS,
            ModelDialect::PlainText => DEFAULT_PLAIN_TEXT_MAX_TOKENS,
        }
    }
}

impl FromStr for ModelDialect {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "messages" => Ok(ModelDialect::Messages),
            "plain-text" | "plain_text" => Ok(ModelDialect::PlainText),
            other => Err(format!("unknown model dialect '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelInvokeConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub dialect: ModelDialect,
    pub guardrail_version: String,
    pub timeout_ms: u64,
}

impl ModelInvokeConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let dialect = match optional_trimmed_env("MODEL_DIALECT") {
            Some(raw) => raw
                .parse::<ModelDialect>()
                .map_err(ConfigError::InvalidConfiguration)?,
            None => ModelDialect::Messages,
        };

        Ok(Self {
            endpoint: require_http_endpoint_env("MODEL_INVOKE_ENDPOINT")?,
            api_key: require_non_empty_env("MODEL_API_KEY")?,
            model_id: optional_trimmed_env("MODEL_ID")
                .unwrap_or_else(|| dialect.default_model_id().to_string()),
            dialect,
            guardrail_version: optional_trimmed_env("GUARDRAIL_VERSION")
                .unwrap_or_else(|| DEFAULT_GUARDRAIL_VERSION.to_string()),
            timeout_ms: parse_u64_env("MODEL_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Clone)]
pub struct ModelInvokeClient {
    client: reqwest::Client,
    config: ModelInvokeConfig,
}

impl ModelInvokeClient {
    pub fn new(config: ModelInvokeConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn invoke(&self, envelope: &PromptEnvelope) -> Result<GenerationResult, InvocationError> {
        let url = format!(
            "{}/model/{}/invoke",
            self.config.endpoint, self.config.model_id
        );
        let request_body = match self.config.dialect {
            ModelDialect::Messages => json!({
                "anthropic_version": MESSAGES_SCHEMA_VERSION,
                "max_tokens": envelope
                    .max_tokens
                    .unwrap_or_else(|| self.config.dialect.default_max_tokens()),
                "system": envelope.system,
                "messages": [
                    {
                        "role": "user",
                        "content": [{"type": "text", "text": envelope.user}]
                    }
                ]
            }),
            ModelDialect::PlainText => json!({
                "inputText": format!("{}\n{}", envelope.system, envelope.user),
                "textGenerationConfig": {
                    "maxTokenCount": envelope
                        .max_tokens
                        .unwrap_or_else(|| self.config.dialect.default_max_tokens()),
                    "stopSequences": [],
                    "temperature": 0,
                    "topP": 1
                }
            }),
        };

        let mut request = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body);
        if let Some(guardrail) = &envelope.guardrail {
            request = request
                .header(GUARDRAIL_IDENTIFIER_HEADER, guardrail)
                .header(GUARDRAIL_VERSION_HEADER, &self.config.guardrail_version);
        }

        let response = request.send().await.map_err(map_transport_error)?;

        let status = response.status();
        let header_request_id = header_request_id(response.headers());
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

        let text = match self.config.dialect {
            ModelDialect::Messages => {
                let parsed: MessagesResponse = serde_json::from_str(&body).map_err(|_| {
                    InvocationError::InvalidModelPayload("response_json_parse_failed".to_string())
                })?;
                parsed
                    .content
                    .into_iter()
                    .next()
                    .map(|block| block.text)
                    .ok_or_else(|| {
                        InvocationError::InvalidModelPayload("missing_completion".to_string())
                    })?
            }
            ModelDialect::PlainText => {
                let parsed: PlainTextResponse = serde_json::from_str(&body).map_err(|_| {
                    InvocationError::InvalidModelPayload("response_json_parse_failed".to_string())
                })?;
                parsed
                    .results
                    .into_iter()
                    .next()
                    .map(|result| result.output_text)
                    .ok_or_else(|| {
                        InvocationError::InvalidModelPayload("missing_completion".to_string())
                    })?
            }
        };

        Ok(GenerationResult {
            model: self.config.model_id.clone(),
            provider_request_id: header_request_id,
            text,
        })
    }

    async fn lookup_guardrail(
        &self,
        guardrail_name: &str,
    ) -> Result<Option<String>, InvocationError> {
        let url = format!("{}/guardrails", self.config.endpoint);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;

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

        let parsed: GuardrailListResponse = serde_json::from_str(&body).map_err(|_| {
            InvocationError::InvalidModelPayload("guardrail_list_parse_failed".to_string())
        })?;

        Ok(parsed
            .guardrails
            .into_iter()
            .find(|guardrail| guardrail.name == guardrail_name)
            .map(|guardrail| guardrail.arn))
    }
}

impl TextGenerator for ModelInvokeClient {
    fn generate<'a>(&'a self, envelope: PromptEnvelope) -> GenerationFuture<'a> {
        Box::pin(async move { self.invoke(&envelope).await })
    }
}

impl GuardrailCatalog for ModelInvokeClient {
    fn resolve_guardrail<'a>(&'a self, guardrail_name: String) -> GuardrailLookupFuture<'a> {
        Box::pin(async move { self.lookup_guardrail(&guardrail_name).await })
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<MessagesContentBlock>,
}

#[derive(Debug, Deserialize)]
struct MessagesContentBlock {
    text: String,
}

#[derive(Debug, Deserialize)]
struct PlainTextResponse {
    #[serde(default)]
    results: Vec<PlainTextResult>,
}

#[derive(Debug, Deserialize)]
struct PlainTextResult {
    #[serde(rename = "outputText")]
    output_text: String,
}

#[derive(Debug, Deserialize)]
struct GuardrailListResponse {
    #[serde(default)]
    guardrails: Vec<GuardrailSummary>,
}

#[derive(Debug, Deserialize)]
struct GuardrailSummary {
    name: String,
    arn: String,
}

fn map_transport_error(err: reqwest::Error) -> InvocationError {
    if err.is_timeout() {
        InvocationError::Timeout
    } else {
        InvocationError::ServiceFailure("request_unavailable".to_string())
    }
}

fn header_request_id(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string)
}
