//! Tool gateway port
//!
//! Enumerates the capabilities of the configured tool servers and
//! dispatches single calls to them.

use async_trait::async_trait;
use serde_json::Value;
use shardguard_domain::CapabilityRegistry;
use thiserror::Error;

/// Text reported for a successful call that returned no content.
pub const NO_CONTENT_SENTINEL: &str = "Tool executed successfully (no content returned)";

/// Result of a successful tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolOutput {
    Text(String),
    NoContent,
}

impl ToolOutput {
    pub fn as_text(&self) -> &str {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::NoContent => NO_CONTENT_SENTINEL,
        }
    }
}

/// Errors from the tool gateway.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToolGatewayError {
    #[error("Unknown tool server: {0}")]
    UnknownServer(String),

    /// Process could not be started or the protocol broke down.
    #[error("Tool server '{server}' unavailable: {message}")]
    Unavailable { server: String, message: String },

    /// The server answered, but reported the call as failed.
    #[error("Tool '{server}.{tool}' failed: {message}")]
    ToolFailed {
        server: String,
        tool: String,
        message: String,
    },

    #[error("Tool server '{server}' timed out after {seconds}s")]
    Timeout { server: String, seconds: u64 },
}

impl ToolGatewayError {
    /// Whether the failure is about reaching the server rather than the call.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            ToolGatewayError::Unavailable { .. } | ToolGatewayError::Timeout { .. }
        )
    }
}

/// Port for reaching tool servers.
#[async_trait]
pub trait ToolGatewayPort: Send + Sync {
    /// Query every configured server for its tools.
    ///
    /// Servers that cannot be reached are logged and skipped; their tools are
    /// simply absent from the registry.
    async fn list_capabilities(&self) -> Result<CapabilityRegistry, ToolGatewayError>;

    /// Issue one call. `args` is a JSON object.
    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        args: Value,
    ) -> Result<ToolOutput, ToolGatewayError>;
}
