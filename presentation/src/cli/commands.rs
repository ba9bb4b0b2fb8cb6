//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use shardguard_domain::{OutputFormat as DomainOutputFormat, RedactionStrategy};
use std::path::PathBuf;

/// Output format for plans, registries and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Colored, human-readable output
    Pretty,
    /// JSON on stdout
    Json,
}

impl From<OutputFormat> for DomainOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Pretty => DomainOutputFormat::Pretty,
            OutputFormat::Json => DomainOutputFormat::Json,
        }
    }
}

/// Model provider for the planner and executor
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ProviderArg {
    Ollama,
    Gemini,
}

impl ProviderArg {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderArg::Ollama => "ollama",
            ProviderArg::Gemini => "gemini",
        }
    }
}

/// Redaction strategy override
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Pseudonymize,
    Mask,
    Generic,
}

impl From<StrategyArg> for RedactionStrategy {
    fn from(strategy: StrategyArg) -> Self {
        match strategy {
            StrategyArg::Pseudonymize => RedactionStrategy::Pseudonymize,
            StrategyArg::Mask => RedactionStrategy::Mask,
            StrategyArg::Generic => RedactionStrategy::Generic,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Plan a request and print the validated plan
    Plan {
        /// The request to plan (read from stdin when omitted)
        prompt: Option<String>,
    },

    /// Plan a request, execute every sub-prompt and print the report
    Run {
        /// The request to run (read from stdin when omitted)
        prompt: Option<String>,
    },

    /// List the tools offered by the configured tool servers
    ListTools,

    /// Apply the redaction rules to a text
    Redact {
        /// Text to redact (read from stdin when omitted)
        text: Option<String>,

        /// Strategy to apply instead of the configured one
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Show the token for every detected span
        #[arg(long)]
        explain: bool,
    },
}

/// CLI arguments for shardguard
#[derive(Parser, Debug)]
#[command(name = "shardguard")]
#[command(author, version, about = "Trust mediation between LLM planners and MCP tool servers")]
#[command(long_about = r#"
ShardGuard keeps sensitive values away from the models that plan and execute
a request.

1. Planning: the request is redacted and split into sub-prompts whose
   sensitive values are replaced by opaque reference tokens.
2. Execution: each sub-prompt is given to a fresh executor session which only
   proposes tool calls, using the tokens.
3. Dispatch: proposed calls are checked against the tool allowlist, tokens are
   resolved to real values and the calls are sent to the MCP tool servers.

Configuration files are loaded from (in priority order):
1. --config <path>                          Explicit config file
2. ./shardguard.toml or ./.shardguard.toml  Project-level config
3. ~/.config/shardguard/config.toml         Global config

Example:
  shardguard plan "Email the Q3 report to alice@example.com"
  shardguard --provider gemini --model gemini-2.0-flash run "Read /tmp/notes.txt"
  shardguard redact "Call me at +1 555-234-5678" --explain
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Model provider for planner and executor
    #[arg(long, value_enum, global = true)]
    pub provider: Option<ProviderArg>,

    /// Model for planner and executor
    #[arg(short, long, value_name = "MODEL", global = true)]
    pub model: Option<String>,

    /// Ollama base URL
    #[arg(long, value_name = "URL", global = true)]
    pub ollama_url: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write operational logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
