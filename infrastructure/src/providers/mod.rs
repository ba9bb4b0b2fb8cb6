//! Model providers.
//!
//! Each provider implements [`LlmGateway`] over a plain HTTP API. Sessions
//! are stateless: every `create_session` returns a fresh session that
//! carries no history, which is what per-step isolation needs.

pub mod gemini;
pub mod ollama;

use crate::config::FileModelConfig;
use shardguard_application::ports::llm_gateway::{GatewayError, LlmGateway};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub use gemini::GeminiGateway;
pub use ollama::OllamaGateway;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Ollama,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::Gemini => "gemini",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ollama" => Ok(ProviderKind::Ollama),
            "gemini" => Ok(ProviderKind::Gemini),
            _ => Err(ProviderError::UnknownProvider(s.to_string())),
        }
    }
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Unknown provider '{0}' (expected 'ollama' or 'gemini')")]
    UnknownProvider(String),

    #[error("API key not found: set the {env} environment variable")]
    MissingApiKey { env: String },

    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

/// Build the gateway described by a `[planner]` / `[executor]` section.
pub fn build_gateway(config: &FileModelConfig) -> Result<Arc<dyn LlmGateway>, ProviderError> {
    let kind: ProviderKind = config.provider.parse()?;
    let timeout = Duration::from_secs(config.timeout_seconds);

    let gateway: Arc<dyn LlmGateway> = match kind {
        ProviderKind::Ollama => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| ollama::DEFAULT_BASE_URL.to_string());
            Arc::new(OllamaGateway::new(base_url, timeout)?)
        }
        ProviderKind::Gemini => {
            let api_key = std::env::var(&config.api_key_env)
                .ok()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| ProviderError::MissingApiKey {
                    env: config.api_key_env.clone(),
                })?;
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string());
            Arc::new(GeminiGateway::new(base_url, api_key, timeout)?)
        }
    };

    info!(provider = %kind, model = %config.model, "Model provider configured");
    Ok(gateway)
}

/// Map a transport-level reqwest failure.
pub(crate) fn map_http_error(e: reqwest::Error) -> GatewayError {
    if e.is_timeout() {
        GatewayError::Timeout
    } else if e.is_connect() {
        GatewayError::ConnectionError(e.to_string())
    } else if e.is_decode() {
        GatewayError::InvalidResponse(e.to_string())
    } else {
        GatewayError::RequestFailed(e.to_string())
    }
}

/// Turn a non-success HTTP status into a gateway error.
pub(crate) fn status_error(status: reqwest::StatusCode, body: &str, model: &str) -> GatewayError {
    if status == reqwest::StatusCode::NOT_FOUND {
        GatewayError::ModelNotAvailable(format!("{} ({})", model, body.trim()))
    } else {
        GatewayError::RequestFailed(format!("HTTP {}: {}", status.as_u16(), body.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parse() {
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Ollama);
        assert_eq!(" Gemini ".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!(matches!(
            "openai".parse::<ProviderKind>(),
            Err(ProviderError::UnknownProvider(_))
        ));
    }

    #[test]
    fn test_status_error() {
        assert!(matches!(
            status_error(reqwest::StatusCode::NOT_FOUND, "model not found", "llama3.2"),
            GatewayError::ModelNotAvailable(_)
        ));
        match status_error(reqwest::StatusCode::INTERNAL_SERVER_ERROR, "boom\n", "m") {
            GatewayError::RequestFailed(message) => assert_eq!(message, "HTTP 500: boom"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_build_ollama_gateway() {
        let config = FileModelConfig::default();
        let gateway = build_gateway(&config).unwrap();
        assert_eq!(gateway.provider_name(), "ollama");
    }

    #[test]
    fn test_build_gemini_gateway_requires_key() {
        let config = FileModelConfig {
            provider: "gemini".to_string(),
            api_key_env: "SHARDGUARD_TEST_UNSET_GEMINI_KEY".to_string(),
            ..FileModelConfig::default()
        };
        assert!(matches!(
            build_gateway(&config),
            Err(ProviderError::MissingApiKey { .. })
        ));
    }

    #[test]
    fn test_build_gateway_unknown_provider() {
        let config = FileModelConfig {
            provider: "bedrock".to_string(),
            ..FileModelConfig::default()
        };
        assert!(matches!(
            build_gateway(&config),
            Err(ProviderError::UnknownProvider(_))
        ));
    }
}
