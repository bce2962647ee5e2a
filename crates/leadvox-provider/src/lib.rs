pub mod anthropic;
pub mod openai;
pub mod transcribe;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;
pub use transcribe::{AudioClip, Transcriber, WhisperTranscriber};
pub use types::*;

/// The completion engine seen by the intent pipeline: one prompt in, free
/// text out.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn chat(&self, request: LlmRequest) -> Result<LlmResponse>;
    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderErrorKind {
    RateLimit,
    ServerError,
    Timeout,
    AuthError,
    InvalidRequest,
    Unknown,
}

impl ProviderErrorKind {
    pub fn from_status(status: reqwest::StatusCode) -> Self {
        match status.as_u16() {
            429 => Self::RateLimit,
            401 | 403 => Self::AuthError,
            400 | 422 => Self::InvalidRequest,
            500..=599 => Self::ServerError,
            _ => Self::Unknown,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimit | Self::ServerError | Self::Timeout)
    }
}

pub(crate) fn format_api_error(
    provider: &str,
    status: reqwest::StatusCode,
    detail: Option<(String, String)>,
) -> anyhow::Error {
    let kind = ProviderErrorKind::from_status(status);
    let retryable = if kind.is_retryable() {
        " [retryable]"
    } else {
        ""
    };
    match detail {
        Some((message, error_type)) => {
            anyhow!("{provider} api error ({status}){retryable}: {message} ({error_type})")
        }
        None => anyhow!("{provider} api error ({status}){retryable}"),
    }
}

pub(crate) fn send_error(provider: &str, timeout: Duration, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        anyhow!(
            "{provider} api error (timeout) [retryable]: request timed out after {}s",
            timeout.as_secs()
        )
    } else if err.is_connect() {
        anyhow!("{provider} api error (connect) [retryable]: {err}")
    } else {
        err.into()
    }
}

pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_default()
}

// ============================================================
// Provider Configuration
// ============================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    #[default]
    Anthropic,
    OpenAI,
}

/// Connection settings for the completion engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Uses the provider's public endpoint when unset
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

impl ProviderConfig {
    pub fn new(provider_type: ProviderType) -> Self {
        Self {
            provider_type,
            api_key: None,
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Create a provider from configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>> {
    let provider: Arc<dyn LlmProvider> = match config.provider_type {
        ProviderType::Anthropic => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("anthropic requires api_key"))?;
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or("https://api.anthropic.com");
            Arc::new(AnthropicProvider::new(key.clone(), base_url).with_timeout(config.timeout()))
        }
        ProviderType::OpenAI => {
            let key = config
                .api_key
                .as_ref()
                .ok_or_else(|| anyhow!("openai requires api_key"))?;
            let base_url = config
                .base_url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1");
            Arc::new(OpenAiProvider::new(key.clone(), base_url).with_timeout(config.timeout()))
        }
    };
    tracing::info!("Created completion provider ({:?})", config.provider_type);
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_kind_classification() {
        assert_eq!(
            ProviderErrorKind::from_status(reqwest::StatusCode::TOO_MANY_REQUESTS),
            ProviderErrorKind::RateLimit
        );
        assert_eq!(
            ProviderErrorKind::from_status(reqwest::StatusCode::INTERNAL_SERVER_ERROR),
            ProviderErrorKind::ServerError
        );
        assert_eq!(
            ProviderErrorKind::from_status(reqwest::StatusCode::UNAUTHORIZED),
            ProviderErrorKind::AuthError
        );
        assert_eq!(
            ProviderErrorKind::from_status(reqwest::StatusCode::BAD_REQUEST),
            ProviderErrorKind::InvalidRequest
        );
        assert!(ProviderErrorKind::RateLimit.is_retryable());
        assert!(ProviderErrorKind::Timeout.is_retryable());
        assert!(!ProviderErrorKind::AuthError.is_retryable());
    }

    #[test]
    fn format_api_error_with_detail() {
        let err = format_api_error(
            "anthropic",
            reqwest::StatusCode::BAD_REQUEST,
            Some(("messages: required".into(), "invalid_request_error".into())),
        );
        let text = err.to_string();
        assert!(text.starts_with("anthropic api error (400"));
        assert!(text.contains("messages: required"));
        assert!(!text.contains("[retryable]"));
    }

    #[test]
    fn format_api_error_without_detail_marks_retryable() {
        let err = format_api_error("openai", reqwest::StatusCode::SERVICE_UNAVAILABLE, None);
        let text = err.to_string();
        assert!(text.contains("503"));
        assert!(text.contains("[retryable]"));
    }

    #[test]
    fn create_provider_requires_api_key() {
        let err = create_provider(&ProviderConfig::new(ProviderType::Anthropic))
            .err()
            .unwrap();
        assert!(err.to_string().contains("anthropic requires api_key"));

        let err = create_provider(&ProviderConfig::new(ProviderType::OpenAI))
            .err()
            .unwrap();
        assert!(err.to_string().contains("openai requires api_key"));
    }

    #[test]
    fn create_provider_with_key_succeeds() {
        let config = ProviderConfig::new(ProviderType::OpenAI)
            .with_api_key("sk-test")
            .with_base_url("http://localhost:9999/v1");
        assert!(create_provider(&config).is_ok());
    }

    #[test]
    fn provider_config_deserializes_with_defaults() {
        let config: ProviderConfig =
            serde_json::from_value(serde_json::json!({"type": "anthropic", "api_key": "k"}))
                .unwrap();
        assert_eq!(config.provider_type, ProviderType::Anthropic);
        assert_eq!(config.timeout_secs, 60);
        assert!(config.base_url.is_none());
    }
}
