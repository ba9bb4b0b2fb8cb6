//! Tool-intent parsing from executor model output.
//!
//! The executor is asked for a bare JSON array of `{server, tool, args}`
//! objects. Models routinely wrap it in fences or prose, so parsing is
//! forgiving about *where* the array is and strict about *what* it contains:
//! one malformed element rejects the whole array.

use super::entities::{LlmStepResponse, ToolCall};
use crate::util::{balanced_span, strip_code_fence};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Upper bound on how far the fallback scanner looks for a closing bracket.
const MAX_SPAN_BYTES: usize = 64 * 1024;

const ALLOWED_KEYS: [&str; 3] = ["server", "tool", "args"];

static ARRAY_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[\s*\{").expect("Invalid regex"));

/// Parse executor output into a validated [`LlmStepResponse`].
///
/// Never fails: unparseable or non-conforming output yields an empty
/// response.
pub fn parse_tool_intents(raw: &str) -> LlmStepResponse {
    let cleaned = strip_code_fence(raw);

    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(cleaned) {
        return validate_intents(&items).unwrap_or_default();
    }

    for found in ARRAY_START.find_iter(cleaned) {
        let Some(span) = balanced_span(cleaned, found.start(), MAX_SPAN_BYTES) else {
            continue;
        };
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(span) {
            return validate_intents(&items).unwrap_or_default();
        }
    }

    LlmStepResponse::empty()
}

/// All-or-nothing validation of a parsed intent array.
fn validate_intents(items: &[Value]) -> Option<LlmStepResponse> {
    items
        .iter()
        .map(validate_intent)
        .collect::<Option<Vec<_>>>()
        .map(LlmStepResponse::new)
}

fn validate_intent(item: &Value) -> Option<ToolCall> {
    let object = item.as_object()?;
    if object.keys().any(|key| !ALLOWED_KEYS.contains(&key.as_str())) {
        return None;
    }

    let server = non_empty_str(object.get("server")?)?;
    let tool = non_empty_str(object.get("tool")?)?;
    let args = match object.get("args") {
        None => None,
        Some(Value::Object(map)) => Some(map.clone()),
        Some(_) => return None,
    };

    Some(ToolCall {
        server: server.to_string(),
        tool: tool.to_string(),
        args,
    })
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().filter(|s| !s.trim().is_empty())
}
