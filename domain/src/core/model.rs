//! Model value object

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a model served by a provider (Value Object)
///
/// Providers are selected by configuration, so the domain only carries the
/// identifier the backend understands (`llama3.2`, `gemini-2.0-flash`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Model(String);

impl Model {
    pub fn new(name: impl Into<String>) -> Result<Self, DomainError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::InvalidModel(name));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Model {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Model::new(s)
    }
}

impl TryFrom<String> for Model {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Model::new(value)
    }
}

impl From<Model> for String {
    fn from(model: Model) -> Self {
        model.0
    }
}
