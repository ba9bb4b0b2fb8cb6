//! Domain layer for shardguard
//!
//! This crate contains the core logic of the trust-mediation pipeline. It has
//! no dependencies on infrastructure or presentation concerns and performs
//! no I/O.
//!
//! # Core Concepts
//!
//! ## Plan
//!
//! The planner decomposes a user request into ordered [`SubPrompt`]s. Each
//! carries its own `opaque_values`: the real values behind the reference
//! tokens in its content. Plans are parsed fail-closed ([`parse_plan`]).
//!
//! ## Capability Registry
//!
//! The allowlist of `server.tool` pairs ([`CapabilityRegistry`]). Nothing
//! outside it is ever dispatched.
//!
//! ## Tool Intents
//!
//! The executor's proposed calls ([`LlmStepResponse`]), parsed by
//! [`parse_tool_intents`] which degrades to "no action" rather than failing.
//!
//! ## Redaction
//!
//! Rule-driven replacement of sensitive spans ([`Redactor`]).

pub mod config;
pub mod core;
pub mod plan;
pub mod prompt;
pub mod redaction;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use config::OutputFormat;
pub use core::{error::DomainError, model::Model, request::UserRequest};
pub use plan::{
    Plan, PlanParseError, SubPrompt, extract_plan_json, find_references, is_reference_token,
    output_schema::validate_output, parse_plan, parse_plan_json,
};
pub use prompt::PromptTemplate;
pub use redaction::{
    Extraction, RedactionError, RedactionRule, RedactionStrategy, Redactor, RuleSet, RuleSpec,
    redactor::DEFAULT_MASK_KEEP,
};
pub use tool::{
    CapabilityEntry, CapabilityId, CapabilityRegistry, LlmStepResponse, ServerInfo, ToolCall,
    parse_tool_intents,
};
