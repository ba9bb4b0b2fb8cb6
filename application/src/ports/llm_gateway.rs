//! LLM Gateway port
//!
//! The planner and the executor are both reached through this port. The
//! contract is deliberately narrow: text in, text out.

use async_trait::async_trait;
use shardguard_domain::Model;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,
}

/// Gateway for LLM communication
///
/// Implementations (adapters) live in the infrastructure layer, one per
/// backend, selected by configuration.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Provider name for logs (`ollama`, `gemini`, ...)
    fn provider_name(&self) -> &str;

    /// Create a new session with the specified model.
    ///
    /// Each call must return an independent session with no memory of any
    /// other session.
    async fn create_session(&self, model: &Model) -> Result<Box<dyn LlmSession>, GatewayError>;
}

/// An active LLM session
#[async_trait]
pub trait LlmSession: Send + Sync {
    /// Get the model used by this session
    fn model(&self) -> &Model;

    /// Send a prompt and get the raw response text
    async fn send(&self, content: &str) -> Result<String, GatewayError>;

    /// Release backend resources. Sessions are unusable afterwards.
    async fn close(&self) {}
}
