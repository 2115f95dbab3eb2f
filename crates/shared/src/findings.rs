use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

use crate::config::ConfigError;
use crate::config_env::{
    parse_u32_env, parse_u64_env, require_http_endpoint_env, require_non_empty_env,
};
use crate::models::SecurityFinding;

const DEFAULT_PAGE_SIZE: u32 = 2;
const DEFAULT_SWEEP_LIMIT: u32 = 2;
const DEFAULT_WINDOW_DAYS: u32 = 30;
const DEFAULT_TIMEOUT_MS: u64 = 15_000;

pub type FindingsFetchFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<SecurityFinding>, FindingsError>> + Send + 'a>>;

#[derive(Debug, Error)]
pub enum FindingsError {
    #[error("findings request timed out")]
    Timeout,
    #[error("findings request failed: {0}")]
    ServiceFailure(String),
    #[error("findings feed returned an invalid payload: {0}")]
    InvalidFindingsPayload(String),
}

/// Source of active security findings for the report sweep.
pub trait FindingsSource: Send + Sync {
    fn fetch_recent<'a>(&'a self) -> FindingsFetchFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct FindingsConfig {
    pub endpoint: String,
    pub api_key: String,
    /// Findings requested per page.
    pub page_size: u32,
    /// Hard cap on findings processed in one sweep.
    pub sweep_limit: u32,
    pub window_days: u32,
    pub timeout_ms: u64,
}

impl FindingsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require_http_endpoint_env("FINDINGS_ENDPOINT")?,
            api_key: require_non_empty_env("FINDINGS_API_KEY")?,
            page_size: parse_u32_env("FINDINGS_PAGE_SIZE", DEFAULT_PAGE_SIZE)?,
            sweep_limit: parse_u32_env("FINDINGS_SWEEP_LIMIT", DEFAULT_SWEEP_LIMIT)?,
            window_days: parse_u32_env("FINDINGS_WINDOW_DAYS", DEFAULT_WINDOW_DAYS)?,
            timeout_ms: parse_u64_env("FINDINGS_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Clone)]
pub struct FindingsClient {
    client: reqwest::Client,
    config: FindingsConfig,
}

impl FindingsClient {
    pub fn new(config: FindingsConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    /// Pulls active findings updated inside the configured window, newest
    /// first, following pagination tokens until the sweep limit is reached.
    async fn fetch_recent_findings(&self) -> Result<Vec<SecurityFinding>, FindingsError> {
        let url = format!("{}/findings", self.config.endpoint);
        let now = Utc::now();
        let window_start = now - chrono::Duration::days(i64::from(self.config.window_days));

        let mut findings: Vec<SecurityFinding> = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let mut request_body = json!({
                "MaxResults": self.config.page_size,
                "SortCriteria": [{"Field": "UpdatedAt", "SortOrder": "DESC"}],
                "Filters": {
                    "RecordState": [{"Value": "ACTIVE", "Comparison": "EQUALS"}],
                    "UpdatedAt": [{
                        "Start": window_start.to_rfc3339(),
                        "End": now.to_rfc3339(),
                    }],
                },
            });
            if let Some(token) = &next_token
                && let Some(body) = request_body.as_object_mut()
            {
                body.insert("NextToken".to_string(), json!(token));
            }

            let response = self
                .client
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&request_body)
                .send()
                .await
                .map_err(|err| {
                    if err.is_timeout() {
                        FindingsError::Timeout
                    } else {
                        FindingsError::ServiceFailure("request_unavailable".to_string())
                    }
                })?;

            let status = response.status();
            let body = response.text().await.map_err(|_| {
                FindingsError::InvalidFindingsPayload("response_body_read_failed".to_string())
            })?;
            if !status.is_success() {
                return Err(FindingsError::ServiceFailure(format!(
                    "status={}",
                    status.as_u16()
                )));
            }

            let page: FindingsPage = serde_json::from_str(&body).map_err(|_| {
                FindingsError::InvalidFindingsPayload("findings_page_parse_failed".to_string())
            })?;

            findings.extend(page.findings.into_iter().map(SecurityFinding::from));

            if findings.len() >= self.config.sweep_limit as usize {
                findings.truncate(self.config.sweep_limit as usize);
                break;
            }
            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        Ok(findings)
    }
}

impl FindingsSource for FindingsClient {
    fn fetch_recent<'a>(&'a self) -> FindingsFetchFuture<'a> {
        Box::pin(async move { self.fetch_recent_findings().await })
    }
}

#[derive(Debug, Deserialize)]
struct FindingsPage {
    #[serde(rename = "Findings", default)]
    findings: Vec<UpstreamFinding>,
    #[serde(rename = "NextToken", default)]
    next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpstreamFinding {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    severity: Option<UpstreamSeverity>,
    #[serde(default)]
    resources: Vec<UpstreamResource>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct UpstreamSeverity {
    #[serde(default)]
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpstreamResource {
    #[serde(rename = "Type", default)]
    resource_type: Option<String>,
}

impl From<UpstreamFinding> for SecurityFinding {
    fn from(finding: UpstreamFinding) -> Self {
        let resource_type = finding
            .resources
            .into_iter()
            .next()
            .and_then(|resource| resource.resource_type)
            .unwrap_or_else(|| "N/A".to_string());

        Self {
            id: finding.id,
            title: finding.title,
            description: finding.description,
            severity: finding.severity.and_then(|severity| severity.label),
            resource_type: Some(resource_type),
            updated_at: finding.updated_at,
            extra: serde_json::Map::new(),
        }
    }
}
