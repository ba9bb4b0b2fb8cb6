//! Plan parsing errors

use thiserror::Error;

/// Structural problems with a plan.
///
/// These mean the planner violated the output contract at the format level;
/// they are not retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanParseError {
    #[error("No JSON object found in planner output")]
    NoJson,

    #[error("Missing required field '{0}'")]
    MissingField(String),

    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Plan has no sub_prompts")]
    EmptySubPrompts,

    #[error("Duplicate sub_prompt id {0}")]
    DuplicateId(u32),

    #[error("Sub-prompt {id} has an invalid output_schema: {message}")]
    InvalidOutputSchema { id: u32, message: String },

    #[error("Reference token {token} in {location} has no opaque value")]
    UnmappedReference { location: String, token: String },
}

impl PlanParseError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PlanParseError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
