use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use super::{
    DocumentIndex, DocumentQueryFuture, IndexLookupFuture, RetrievalError, RetrievedDocument,
};
use crate::config::ConfigError;
use crate::config_env::{
    ensure_http_endpoint, optional_trimmed_env, parse_u32_env, parse_u64_env, require_non_empty_env,
};

const DEFAULT_API_VERSION: &str = "2024-07-01";
const DEFAULT_TIMEOUT_MS: u64 = 15_000;
const DEFAULT_QUERY_PAGE_SIZE: u32 = 3;
const DEFAULT_RETRIEVE_PAGE_SIZE: u32 = 10;

const QUERY_SELECT_FIELDS: &str = "id,title,excerpt,uri,score";
const RETRIEVE_SELECT_FIELDS: &str = "id,title,content";

#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub query_page_size: u32,
    pub retrieve_page_size: u32,
    pub timeout_ms: u64,
}

impl SearchIndexConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = match optional_trimmed_env("SEARCH_ENDPOINT") {
            Some(endpoint) => endpoint,
            None => {
                let service = require_non_empty_env("SEARCH_SERVICE")?;
                format!("https://{service}.search.windows.net")
            }
        };

        Ok(Self {
            endpoint: ensure_http_endpoint("SEARCH_ENDPOINT", endpoint)?,
            api_key: require_non_empty_env("SEARCH_API_KEY")?,
            api_version: optional_trimmed_env("SEARCH_API_VERSION")
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            query_page_size: parse_u32_env("SEARCH_QUERY_PAGE_SIZE", DEFAULT_QUERY_PAGE_SIZE)?,
            retrieve_page_size: parse_u32_env(
                "SEARCH_RETRIEVE_PAGE_SIZE",
                DEFAULT_RETRIEVE_PAGE_SIZE,
            )?,
            timeout_ms: parse_u64_env("SEARCH_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Clone)]
pub struct SearchIndexClient {
    client: reqwest::Client,
    config: SearchIndexConfig,
}

impl SearchIndexClient {
    pub fn new(config: SearchIndexConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    /// Same client, different credential. Used when a caller supplies its own
    /// search key for a single request.
    pub fn with_api_key(&self, api_key: impl Into<String>) -> Self {
        let mut swapped = self.clone();
        swapped.config.api_key = api_key.into();
        swapped
    }

    async fn lookup_index_id(&self, index_name: &str) -> Result<Option<String>, RetrievalError> {
        let url = format!(
            "{}/indexes?api-version={}",
            self.config.endpoint, self.config.api_version
        );

        let response = self
            .client
            .get(&url)
            .header("api-key", &self.config.api_key)
            .send()
            .await
            .map_err(map_transport_error)?;
        let body = read_success_body(response).await?;

        let parsed: IndexListResponse = serde_json::from_str(&body).map_err(|_| {
            RetrievalError::InvalidIndexPayload("index_list_parse_failed".to_string())
        })?;

        Ok(parsed
            .indexes
            .into_iter()
            .find(|index| index.name == index_name)
            .map(|index| index.id))
    }

    async fn search_documents(
        &self,
        operation: &str,
        index_id: &str,
        query: &str,
        page_size: u32,
        select: &str,
    ) -> Result<Vec<RetrievedDocument>, RetrievalError> {
        let url = format!(
            "{}/indexes/{}/docs/{}?api-version={}",
            self.config.endpoint, index_id, operation, self.config.api_version
        );
        let request_body = json!({
            "search": query,
            "top": page_size,
            "select": select,
        });

        let response = self
            .client
            .post(&url)
            .header("api-key", &self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(map_transport_error)?;
        let body = read_success_body(response).await?;

        let parsed: DocsResponse = serde_json::from_str(&body).map_err(|_| {
            RetrievalError::InvalidIndexPayload("docs_response_parse_failed".to_string())
        })?;

        if let Some(warning) = parsed.warning {
            warn!(index_id = %index_id, warning = %warning, "document index returned a warning");
        }

        let mut documents = parsed
            .value
            .into_iter()
            .map(RetrievedDocument::from)
            .collect::<Vec<_>>();
        // The index is not trusted to honor the requested page size.
        documents.truncate(page_size as usize);
        Ok(documents)
    }
}

impl DocumentIndex for SearchIndexClient {
    fn resolve_index_id<'a>(&'a self, index_name: String) -> IndexLookupFuture<'a> {
        Box::pin(async move { self.lookup_index_id(&index_name).await })
    }

    fn query<'a>(&'a self, index_id: String, query: String) -> DocumentQueryFuture<'a> {
        Box::pin(async move {
            self.search_documents(
                "search",
                &index_id,
                &query,
                self.config.query_page_size,
                QUERY_SELECT_FIELDS,
            )
            .await
        })
    }

    fn retrieve<'a>(&'a self, index_id: String, query: String) -> DocumentQueryFuture<'a> {
        Box::pin(async move {
            self.search_documents(
                "retrieve",
                &index_id,
                &query,
                self.config.retrieve_page_size,
                RETRIEVE_SELECT_FIELDS,
            )
            .await
        })
    }
}

#[derive(Debug, Deserialize)]
struct IndexListResponse {
    #[serde(default)]
    indexes: Vec<IndexSummary>,
}

#[derive(Debug, Deserialize)]
struct IndexSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct DocsResponse {
    #[serde(default)]
    warning: Option<String>,
    #[serde(default)]
    value: Vec<DocumentHit>,
}

#[derive(Debug, Deserialize)]
struct DocumentHit {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    excerpt: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    score: Option<f64>,
}

impl From<DocumentHit> for RetrievedDocument {
    fn from(hit: DocumentHit) -> Self {
        Self {
            id: hit.id,
            title: hit.title.unwrap_or_default(),
            content: hit.content.or(hit.excerpt).unwrap_or_default(),
            uri: hit.uri,
            score: hit.score,
        }
    }
}

fn map_transport_error(err: reqwest::Error) -> RetrievalError {
    if err.is_timeout() {
        RetrievalError::Timeout
    } else {
        RetrievalError::IndexFailure("request_unavailable".to_string())
    }
}

async fn read_success_body(response: reqwest::Response) -> Result<String, RetrievalError> {
    let status = response.status();
    let body = response.text().await.map_err(|_| {
        RetrievalError::InvalidIndexPayload("response_body_read_failed".to_string())
    })?;

    if !status.is_success() {
        return Err(RetrievalError::IndexFailure(format!(
            "status={}",
            status.as_u16()
        )));
    }

    Ok(body)
}
