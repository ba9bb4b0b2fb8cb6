//! Tool call entities produced by the executor model

use super::capability::CapabilityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single proposed tool invocation.
///
/// Untrusted until the execution gateway has checked it against the
/// capability registry and the subtask's suggested tools.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub server: String,
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Map<String, Value>>,
}

impl ToolCall {
    pub fn new(server: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            tool: tool.into(),
            args: None,
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn capability_id(&self) -> CapabilityId {
        CapabilityId::new(&self.server, &self.tool)
    }

    /// Arguments as a JSON object (empty when absent).
    pub fn args_value(&self) -> Value {
        Value::Object(self.args.clone().unwrap_or_default())
    }
}

/// Ordered tool calls proposed for one subtask.
///
/// An empty response means the model proposed no action, which is a valid
/// terminal state for the step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmStepResponse {
    pub tool_calls: Vec<ToolCall>,
}

impl LlmStepResponse {
    pub fn new(tool_calls: Vec<ToolCall>) -> Self {
        Self { tool_calls }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.tool_calls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tool_calls.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolCall> {
        self.tool_calls.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_builder() {
        let call = ToolCall::new("file-operations", "read_file").with_arg("path", "/tmp/a");
        assert_eq!(call.capability_id().to_string(), "file-operations.read_file");
        assert_eq!(call.args_value(), json!({"path": "/tmp/a"}));
    }

    #[test]
    fn test_args_value_defaults_to_empty_object() {
        let call = ToolCall::new("web-operations", "fetch");
        assert_eq!(call.args_value(), json!({}));
    }

    #[test]
    fn test_serialize_omits_missing_args() {
        let call = ToolCall::new("s", "t");
        assert_eq!(
            serde_json::to_value(&call).unwrap(),
            json!({"server": "s", "tool": "t"})
        );
    }
}
