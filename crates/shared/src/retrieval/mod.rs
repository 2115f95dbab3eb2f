use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod search;

pub use search::{SearchIndexClient, SearchIndexConfig};

pub type DocumentQueryFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<RetrievedDocument>, RetrievalError>> + Send + 'a>>;

pub type IndexLookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<String>, RetrievalError>> + Send + 'a>>;

/// One scored document pulled out of the index for prompt grounding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("document index request timed out")]
    Timeout,
    #[error("document index request failed: {0}")]
    IndexFailure(String),
    #[error("document index returned an invalid payload: {0}")]
    InvalidIndexPayload(String),
    #[error("document index named '{0}' was not found")]
    IndexNotFound(String),
}

pub trait DocumentIndex: Send + Sync {
    /// Looks an index id up by its display name. `Ok(None)` means the lookup
    /// itself succeeded but no index carries that name.
    fn resolve_index_id<'a>(&'a self, index_name: String) -> IndexLookupFuture<'a>;

    /// Ranked excerpt search, bounded by the query page size.
    fn query<'a>(&'a self, index_id: String, query: String) -> DocumentQueryFuture<'a>;

    /// Full-content passage retrieval, bounded by the retrieve page size.
    fn retrieve<'a>(&'a self, index_id: String, query: String) -> DocumentQueryFuture<'a>;
}
