//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

use crate::providers::{ProviderKind, ollama};
use serde::{Deserialize, Serialize};
use shardguard_application::PipelineParams;
use shardguard_domain::{Model, OutputFormat, RedactionStrategy};
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

// Re-export OutputFormat from domain for convenience
pub use shardguard_domain::OutputFormat as FileOutputFormat;

const DEFAULT_API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("{field} cannot be 0")]
    ZeroValue { field: &'static str },

    #[error("[{section}] model name cannot be empty")]
    EmptyModelName { section: &'static str },

    #[error("[{section}] unknown provider '{value}' (expected 'ollama' or 'gemini')")]
    UnknownProvider { section: &'static str, value: String },

    #[error("redaction.strategy: unknown value '{0}' (expected pseudonymize, mask or generic)")]
    UnknownStrategy(String),

    #[error("tool_servers[{index}] has an empty name")]
    EmptyToolServerName { index: usize },

    #[error("tool server '{0}' has an empty command")]
    EmptyToolServerCommand(String),

    #[error("duplicate tool server name: {0}")]
    DuplicateToolServer(String),
}

/// `[planner]` / `[executor]` model settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelConfig {
    /// `ollama` or `gemini`
    pub provider: String,
    pub model: String,
    /// Provider endpoint; the provider default when unset
    pub base_url: Option<String>,
    /// Environment variable holding the API key (Gemini only)
    pub api_key_env: String,
    pub timeout_seconds: u64,
}

impl Default for FileModelConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default().to_string(),
            model: ollama::DEFAULT_MODEL.to_string(),
            base_url: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout_seconds: 120,
        }
    }
}

impl FileModelConfig {
    pub fn parse_model(&self) -> Option<Model> {
        Model::new(self.model.as_str()).ok()
    }

    fn validate(&self, section: &'static str, errors: &mut Vec<ConfigValidationError>) {
        if self.provider.parse::<ProviderKind>().is_err() {
            errors.push(ConfigValidationError::UnknownProvider {
                section,
                value: self.provider.clone(),
            });
        }
        if self.model.trim().is_empty() {
            errors.push(ConfigValidationError::EmptyModelName { section });
        }
        if self.timeout_seconds == 0 {
            errors.push(ConfigValidationError::ZeroValue {
                field: if section == "planner" {
                    "planner.timeout_seconds"
                } else {
                    "executor.timeout_seconds"
                },
            });
        }
    }
}

/// `[pipeline]` loop bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    pub max_plan_attempts: u32,
    pub tool_timeout_seconds: u64,
    pub require_tools_for_every_step: bool,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let params = PipelineParams::default();
        Self {
            max_plan_attempts: params.max_plan_attempts,
            tool_timeout_seconds: params.tool_timeout.as_secs(),
            require_tools_for_every_step: params.require_tools_for_every_step,
        }
    }
}

/// `[redaction]` settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRedactionConfig {
    /// YAML or TOML rule file; built-in rules when unset
    pub rules_file: Option<PathBuf>,
    pub strategy: String,
    /// Trailing characters left visible by the mask strategy
    pub mask_keep: usize,
}

impl Default for FileRedactionConfig {
    fn default() -> Self {
        Self {
            rules_file: None,
            strategy: RedactionStrategy::default().to_string(),
            mask_keep: shardguard_domain::DEFAULT_MASK_KEEP,
        }
    }
}

impl FileRedactionConfig {
    pub fn parse_strategy(&self) -> Option<RedactionStrategy> {
        self.strategy.parse().ok()
    }
}

/// One `[[tool_servers]]` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileToolServerConfig {
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl FileToolServerConfig {
    fn python_module(name: &str, module: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            command: "python".to_string(),
            args: vec![
                "-m".to_string(),
                format!("shardguard.mcp_servers.{}", module),
            ],
            env: BTreeMap::new(),
            description: Some(description.to_string()),
        }
    }

    /// The four capability domains shipped with the Python tool servers.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::python_module(
                "file-operations",
                "file_server",
                "File operations with privacy controls",
            ),
            Self::python_module(
                "email-operations",
                "email_server",
                "Email operations with privacy controls",
            ),
            Self::python_module(
                "database-operations",
                "database_server",
                "Database operations with privacy controls",
            ),
            Self::python_module(
                "web-operations",
                "web_server",
                "Web operations with privacy controls",
            ),
        ]
    }
}

/// `[output]` settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    pub format: Option<OutputFormat>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}

/// `[logging]` settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// JSONL conversation transcript
    pub conversation_log: Option<PathBuf>,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub planner: FileModelConfig,
    pub executor: FileModelConfig,
    pub pipeline: FilePipelineConfig,
    pub redaction: FileRedactionConfig,
    pub tool_servers: Vec<FileToolServerConfig>,
    pub output: FileOutputConfig,
    pub logging: FileLoggingConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            planner: FileModelConfig::default(),
            executor: FileModelConfig::default(),
            pipeline: FilePipelineConfig::default(),
            redaction: FileRedactionConfig::default(),
            tool_servers: FileToolServerConfig::defaults(),
            output: FileOutputConfig::default(),
            logging: FileLoggingConfig::default(),
        }
    }
}

impl FileConfig {
    /// Validate the entire configuration, returning every problem found.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        self.planner.validate("planner", &mut errors);
        self.executor.validate("executor", &mut errors);

        if self.pipeline.max_plan_attempts == 0 {
            errors.push(ConfigValidationError::ZeroValue {
                field: "pipeline.max_plan_attempts",
            });
        }
        if self.pipeline.tool_timeout_seconds == 0 {
            errors.push(ConfigValidationError::ZeroValue {
                field: "pipeline.tool_timeout_seconds",
            });
        }

        if self.redaction.parse_strategy().is_none() {
            errors.push(ConfigValidationError::UnknownStrategy(
                self.redaction.strategy.clone(),
            ));
        }
        if self.redaction.mask_keep == 0 {
            errors.push(ConfigValidationError::ZeroValue {
                field: "redaction.mask_keep",
            });
        }

        let mut seen = HashSet::new();
        for (index, server) in self.tool_servers.iter().enumerate() {
            let name = server.name.trim();
            if name.is_empty() {
                errors.push(ConfigValidationError::EmptyToolServerName { index });
                continue;
            }
            if server.command.trim().is_empty() {
                errors.push(ConfigValidationError::EmptyToolServerCommand(
                    name.to_string(),
                ));
            }
            if !seen.insert(name) {
                errors.push(ConfigValidationError::DuplicateToolServer(name.to_string()));
            }
        }

        errors
    }

    /// Loop bounds and timeouts for the application layer.
    pub fn pipeline_params(&self) -> PipelineParams {
        PipelineParams::default()
            .with_max_plan_attempts(self.pipeline.max_plan_attempts)
            .with_planner_timeout(Duration::from_secs(self.planner.timeout_seconds))
            .with_executor_timeout(Duration::from_secs(self.executor.timeout_seconds))
            .with_tool_timeout(Duration::from_secs(self.pipeline.tool_timeout_seconds))
            .with_require_tools_for_every_step(self.pipeline.require_tools_for_every_step)
    }
}
