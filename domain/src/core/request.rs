//! User request value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};

/// Raw request text as typed by the user (Value Object)
///
/// This is the only place raw, unredacted text enters the pipeline. It is
/// never handed to a model directly; the planning orchestrator redacts it
/// first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRequest {
    content: String,
}

impl UserRequest {
    pub fn new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::EmptyRequest);
        }
        Ok(Self { content })
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_creation() {
        let request = UserRequest::new("Read /etc/hosts").unwrap();
        assert_eq!(request.content(), "Read /etc/hosts");
    }

    #[test]
    fn test_empty_request_rejected() {
        assert_eq!(UserRequest::new("  \n"), Err(DomainError::EmptyRequest));
    }
}
