use std::time::Duration;

use super::{DeliveryError, ObjectPutFuture, ObjectStore};
use crate::config::ConfigError;
use crate::config_env::{parse_u64_env, require_http_endpoint_env, require_non_empty_env};

const DEFAULT_TIMEOUT_MS: u64 = 15_000;

#[derive(Debug, Clone)]
pub struct ObjectStoreConfig {
    pub endpoint: String,
    pub api_key: String,
    pub bucket: String,
    pub timeout_ms: u64,
}

impl ObjectStoreConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            endpoint: require_http_endpoint_env("STORAGE_ENDPOINT")?,
            api_key: require_non_empty_env("STORAGE_API_KEY")?,
            bucket: require_non_empty_env("STORAGE_BUCKET")?,
            timeout_ms: parse_u64_env("STORAGE_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?,
        })
    }
}

#[derive(Clone)]
pub struct ObjectStoreClient {
    client: reqwest::Client,
    config: ObjectStoreConfig,
}

impl ObjectStoreClient {
    pub fn new(config: ObjectStoreConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| ConfigError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    async fn put(&self, key: &str, body: String) -> Result<(), DeliveryError> {
        let url = format!("{}/{}/{}", self.config.endpoint, self.config.bucket, key);

        let response = self
            .client
            .put(&url)
            .bearer_auth(&self.config.api_key)
            .header("content-type", "text/markdown")
            .body(body)
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
        if !status.is_success() {
            return Err(DeliveryError::TransportFailure(format!(
                "status={}",
                status.as_u16()
            )));
        }

        Ok(())
    }
}

impl ObjectStore for ObjectStoreClient {
    fn put_object<'a>(&'a self, key: String, body: String) -> ObjectPutFuture<'a> {
        Box::pin(async move { self.put(&key, body).await })
    }
}
