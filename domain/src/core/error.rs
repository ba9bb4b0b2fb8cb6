//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Request cannot be empty")]
    EmptyRequest,

    #[error("Invalid capability identifier '{0}': expected 'server.tool'")]
    InvalidCapability(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_capability_display() {
        let error = DomainError::InvalidCapability("read_file".to_string());
        assert_eq!(
            error.to_string(),
            "Invalid capability identifier 'read_file': expected 'server.tool'"
        );
    }
}
