//! Redaction rule errors

use thiserror::Error;

/// Errors raised while compiling a rule set.
///
/// All of them are fatal: redacting with a partially loaded rule set would
/// silently let secrets through.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RedactionError {
    #[error("Rule set is empty")]
    EmptyRuleSet,

    #[error("Rule #{index} has an empty '{field}'")]
    EmptyField { index: usize, field: &'static str },

    #[error("Duplicate rule name: {0}")]
    DuplicateRule(String),

    #[error("Rule '{rule}' has invalid kind '{kind}' (letters, digits, '_' and '-' only)")]
    InvalidKind { rule: String, kind: String },

    #[error("Rule '{rule}' uses unknown flag '{flag}'")]
    UnknownFlag { rule: String, flag: String },

    #[error("Rule '{rule}' has an invalid pattern: {message}")]
    InvalidPattern { rule: String, message: String },

    #[error("Unknown redaction strategy: {0}")]
    UnknownStrategy(String),
}
