use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use super::{DeliveryError, DeliveryReceipt, MailDeliveryFuture, MailTransport, OutboundMail};
use crate::config::ConfigError;
use crate::config_env::{parse_u64_env, require_http_endpoint_env, require_non_empty_env};

const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone)]
pub struct MailApiConfig {
    pub endpoint: String,
    pub api_key: String,
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub timeout_ms: u64,
}

impl MailApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require_http_endpoint_env("MAIL_ENDPOINT")?,
            api_key: require_non_empty_env("MAIL_API_KEY")?,
            sender: require_non_empty_env("EMAIL_FROM")?,
            recipient: require_non_empty_env("EMAIL_TO")?,
            subject: require_non_empty_env("EMAIL_SUBJECT")?,
            timeout_ms: parse_u64_env("MAIL_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Clone)]
pub struct MailApiClient {
    client: reqwest::Client,
    config: MailApiConfig,
}

impl MailApiClient {
    pub fn new(config: MailApiConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn send_mail(&self, mail: &OutboundMail) -> Result<DeliveryReceipt, DeliveryError> {
        let url = format!("{}/v1/messages", self.config.endpoint);
        let request_body = json!({
            "sender": mail.sender,
            "recipient": mail.recipient,
            "subject": mail.subject,
            "body": mail.body,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    DeliveryError::Timeout
                } else {
                    DeliveryError::TransportFailure("request_unavailable".to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|_| {
            DeliveryError::InvalidTransportPayload("response_body_read_failed".to_string())
        })?;
        if !status.is_success() {
            return Err(DeliveryError::TransportFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        let parsed: SendMailResponse = serde_json::from_str(&body).map_err(|_| {
            DeliveryError::InvalidTransportPayload("response_json_parse_failed".to_string())
        })?;
        let message_id = parsed.message_id.ok_or_else(|| {
            DeliveryError::InvalidTransportPayload("missing_message_id".to_string())
        })?;

        Ok(DeliveryReceipt { message_id })
    }
}

impl MailTransport for MailApiClient {
    fn send<'a>(&'a self, mail: OutboundMail) -> MailDeliveryFuture<'a> {
        Box::pin(async move { self.send_mail(&mail).await })
    }
}

#[derive(Debug, Deserialize)]
struct SendMailResponse {
    #[serde(default)]
    message_id: Option<String>,
}
