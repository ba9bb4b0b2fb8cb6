//! Infrastructure layer for shardguard
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer: model providers, the MCP tool-server client,
//! redaction rule loading, configuration file loading and the JSONL
//! conversation log.

pub mod config;
pub mod logging;
pub mod mcp;
pub mod providers;
pub mod redaction;

// Re-export commonly used types
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileLoggingConfig, FileModelConfig,
    FileOutputConfig, FileOutputFormat, FilePipelineConfig, FileRedactionConfig,
    FileToolServerConfig,
};
pub use logging::JsonlConversationLogger;
pub use mcp::{McpError, McpToolGateway};
pub use providers::{
    GeminiGateway, OllamaGateway, ProviderError, ProviderKind, build_gateway,
};
pub use redaction::{RuleFileError, build_redactor, load_rule_set};
