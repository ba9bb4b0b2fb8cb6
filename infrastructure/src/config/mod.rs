//! Configuration file loading for shardguard
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `SHARDGUARD_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./shardguard.toml` or `./.shardguard.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/shardguard/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileLoggingConfig, FileModelConfig, FileOutputConfig,
    FileOutputFormat, FilePipelineConfig, FileRedactionConfig, FileToolServerConfig,
};
pub use loader::ConfigLoader;
