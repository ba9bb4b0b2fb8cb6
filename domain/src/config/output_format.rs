//! Output format value object

use serde::{Deserialize, Serialize};

/// How plans, registries and pipeline reports are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable, colored console output (default)
    #[default]
    Pretty,
    /// Machine-readable JSON on stdout
    Json,
}
