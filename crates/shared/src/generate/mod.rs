use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

mod chat;
mod invoke;

pub use chat::{ChatCompletionsClient, ChatCompletionsConfig};
pub use invoke::{ModelDialect, ModelInvokeClient, ModelInvokeConfig};

pub type GenerationFuture<'a> =
    Pin<Box<dyn Future<Output = Result<GenerationResult, InvocationError>> + Send + 'a>>;

pub type GuardrailLookupFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Option<String>, InvocationError>> + Send + 'a>>;

/// A fully assembled prompt: instruction framing plus the user turn, with the
/// optional knobs a backend may honor.
#[derive(Debug, Clone)]
pub struct PromptEnvelope {
    pub system: String,
    pub user: String,
    pub max_tokens: Option<u32>,
    pub guardrail: Option<String>,
}

impl PromptEnvelope {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: None,
            guardrail: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_guardrail(mut self, guardrail: impl AsRef<str>) -> Self {
        let trimmed = guardrail.as_ref().trim();
        if !trimmed.is_empty() {
            self.guardrail = Some(trimmed.to_string());
        }
        self
    }
}

#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub model: String,
    pub provider_request_id: Option<String>,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum InvocationError {
    #[error("model request timed out")]
    Timeout,
    #[error("model rejected the provided credentials")]
    Unauthorized,
    #[error("model request failed: {0}")]
    ServiceFailure(String),
    #[error("model returned an invalid payload: {0}")]
    InvalidModelPayload(String),
}

pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, envelope: PromptEnvelope) -> GenerationFuture<'a>;
}

/// Looks up content guardrails by display name. `Ok(None)` means the catalog
/// answered but has no guardrail under that name.
pub trait GuardrailCatalog: Send + Sync {
    fn resolve_guardrail<'a>(&'a self, guardrail_name: String) -> GuardrailLookupFuture<'a>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_guardrail_ignores_blank_identifiers() {
        let envelope = PromptEnvelope::new("system", "user").with_guardrail("   ");
        assert!(envelope.guardrail.is_none());

        let envelope = PromptEnvelope::new("system", "user").with_guardrail("  guard-1  ");
        assert_eq!(envelope.guardrail.as_deref(), Some("guard-1"));
    }
}
