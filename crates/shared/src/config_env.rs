use std::env;

use crate::config::ConfigError;

pub(crate) fn require_non_empty_env(key: &str) -> Result<String, ConfigError> {
    let raw = env::var(key).map_err(|_| ConfigError::MissingVar(key.to_string()))?;
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MissingVar(key.to_string()));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn parse_u32_env(key: &str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        Err(_) => Ok(default),
    }
}

pub(crate) fn parse_u64_env(key: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|_| ConfigError::ParseInt(key.to_string())),
        Err(_) => Ok(default),
    }
}

pub(crate) fn optional_trimmed_env(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub(crate) fn require_http_endpoint_env(key: &str) -> Result<String, ConfigError> {
    let endpoint = require_non_empty_env(key)?;
    ensure_http_endpoint(key, endpoint)
}

pub(crate) fn ensure_http_endpoint(key: &str, endpoint: String) -> Result<String, ConfigError> {
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::InvalidConfiguration(format!(
            "{key} must start with http:// or https://"
        )));
    }
    Ok(endpoint.trim_end_matches('/').to_string())
}
