//! Execution Gateway
//!
//! The last boundary before a tool server. For one sub-prompt it:
//!
//! 1. authorises every proposed call (registered *and* suggested for this
//!    sub-prompt) before dispatching any of them,
//! 2. resolves reference tokens in the arguments to their true values,
//! 3. dispatches through the [`ToolGatewayPort`],
//! 4. validates the result against the sub-prompt's `output_schema`.

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, event_type,
};
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::tool_gateway::{ToolGatewayError, ToolGatewayPort, ToolOutput};
use crate::use_cases::run_pipeline::{StepFailureKind, ToolCallRecord};
use serde_json::{Value, json};
use shardguard_domain::{CapabilityRegistry, LlmStepResponse, SubPrompt, ToolCall, validate_output};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that stop a sub-prompt's execution
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecuteStepError {
    #[error("Tool '{capability}' is not allowed for sub-prompt {sub_prompt_id}")]
    UnauthorizedTool {
        sub_prompt_id: u32,
        capability: String,
    },

    #[error("Tool '{capability}' unavailable: {source}")]
    ToolUnavailable {
        capability: String,
        #[source]
        source: ToolGatewayError,
    },

    #[error("Tool '{capability}' failed: {message}")]
    ToolFailed { capability: String, message: String },

    #[error("Output of '{capability}' violates its output schema: {message}")]
    OutputSchemaViolation { capability: String, message: String },
}

impl ExecuteStepError {
    pub fn kind(&self) -> StepFailureKind {
        match self {
            ExecuteStepError::UnauthorizedTool { .. } => StepFailureKind::Unauthorized,
            ExecuteStepError::ToolUnavailable { .. } => StepFailureKind::ToolUnavailable,
            ExecuteStepError::ToolFailed { .. } => StepFailureKind::ToolFailed,
            ExecuteStepError::OutputSchemaViolation { .. } => {
                StepFailureKind::OutputSchemaViolation
            }
        }
    }
}

/// The Execution Gateway
pub struct ExecutionGateway {
    tools: Arc<dyn ToolGatewayPort>,
    timeout: Duration,
    logger: Arc<dyn ConversationLogger>,
}

impl ExecutionGateway {
    pub fn new(tools: Arc<dyn ToolGatewayPort>, timeout: Duration) -> Self {
        Self {
            tools,
            timeout,
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub async fn execute(
        &self,
        sub_prompt: &SubPrompt,
        response: &LlmStepResponse,
        registry: &CapabilityRegistry,
    ) -> Result<Vec<ToolCallRecord>, ExecuteStepError> {
        self.execute_with_progress(sub_prompt, response, registry, &NoProgress)
            .await
    }

    /// Run every call of `response` in order, stopping at the first failure.
    pub async fn execute_with_progress(
        &self,
        sub_prompt: &SubPrompt,
        response: &LlmStepResponse,
        registry: &CapabilityRegistry,
        progress: &dyn ProgressNotifier,
    ) -> Result<Vec<ToolCallRecord>, ExecuteStepError> {
        for call in response.iter() {
            authorize(sub_prompt, call, registry)?;
        }

        let mut records = Vec::with_capacity(response.len());
        for call in response.iter() {
            progress.on_tool_call(sub_prompt.id, call);
            let capability = call.capability_id().to_string();
            let result = self.dispatch(sub_prompt, call, &capability).await;
            progress.on_tool_result(sub_prompt.id, &capability, result.is_ok());
            records.push(result?);
        }
        Ok(records)
    }

    async fn dispatch(
        &self,
        sub_prompt: &SubPrompt,
        call: &ToolCall,
        capability: &str,
    ) -> Result<ToolCallRecord, ExecuteStepError> {
        self.logger.log(ConversationEvent::new(
            event_type::TOOL_CALL,
            json!({
                "sub_prompt_id": sub_prompt.id,
                "capability": capability,
                "args": call.args_value(),
            }),
        ));

        let args = resolve_references(&call.args_value(), sub_prompt);
        let outcome = tokio::time::timeout(
            self.timeout,
            self.tools.call_tool(&call.server, &call.tool, args),
        )
        .await
        .unwrap_or_else(|_| {
            Err(ToolGatewayError::Timeout {
                server: call.server.clone(),
                seconds: self.timeout.as_secs(),
            })
        });

        let output = match outcome {
            Ok(output) => output,
            Err(ToolGatewayError::ToolFailed { message, .. }) => {
                warn!(sub_prompt_id = sub_prompt.id, capability, %message, "Tool reported failure");
                self.logger.log(ConversationEvent::tool_result(
                    sub_prompt.id,
                    capability,
                    false,
                    0,
                ));
                return Err(ExecuteStepError::ToolFailed {
                    capability: capability.to_string(),
                    message,
                });
            }
            Err(e) => {
                warn!(sub_prompt_id = sub_prompt.id, capability, error = %e, "Tool unavailable");
                self.logger.log(ConversationEvent::tool_result(
                    sub_prompt.id,
                    capability,
                    false,
                    0,
                ));
                return Err(ExecuteStepError::ToolUnavailable {
                    capability: capability.to_string(),
                    source: e,
                });
            }
        };

        let text = output.as_text().to_string();
        self.logger.log(ConversationEvent::tool_result(
            sub_prompt.id,
            capability,
            true,
            text.len(),
        ));

        if let Some(schema) = &sub_prompt.output_schema {
            let instance = output_instance(&output);
            validate_output(schema, &instance).map_err(|message| {
                warn!(
                    sub_prompt_id = sub_prompt.id,
                    capability,
                    %message,
                    "Output schema violation"
                );
                ExecuteStepError::OutputSchemaViolation {
                    capability: capability.to_string(),
                    message,
                }
            })?;
        }

        info!(sub_prompt_id = sub_prompt.id, capability, "Tool call completed");
        Ok(ToolCallRecord {
            capability: capability.to_string(),
            output: text,
        })
    }
}

/// A call must name a registered capability that the sub-prompt suggested.
fn authorize(
    sub_prompt: &SubPrompt,
    call: &ToolCall,
    registry: &CapabilityRegistry,
) -> Result<(), ExecuteStepError> {
    let capability = call.capability_id().to_string();
    if registry.contains(&call.server, &call.tool) && sub_prompt.suggests(&capability) {
        return Ok(());
    }
    warn!(
        sub_prompt_id = sub_prompt.id,
        capability = %capability,
        "Rejected tool call outside the sub-prompt's allowlist"
    );
    Err(ExecuteStepError::UnauthorizedTool {
        sub_prompt_id: sub_prompt.id,
        capability,
    })
}

/// Replace string values that are exactly a known reference token.
fn resolve_references(value: &Value, sub_prompt: &SubPrompt) -> Value {
    match value {
        Value::String(s) => match sub_prompt.resolve(s) {
            Some(real) => Value::String(real.to_string()),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| resolve_references(item, sub_prompt))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_references(v, sub_prompt)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// JSON to validate: the parsed text when it is JSON, otherwise the text as
/// a string.
fn output_instance(output: &ToolOutput) -> Value {
    match output {
        ToolOutput::Text(text) => {
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.clone()))
        }
        ToolOutput::NoContent => Value::String(output.as_text().to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::use_cases::test_support::{MockToolGateway, registry};

    fn sub_prompt() -> SubPrompt {
        SubPrompt::new(1, "Read [FILE_PATH] and mail <EMAIL:0123456789ab>")
            .with_opaque_value("[FILE_PATH]", "/etc/hosts")
            .with_opaque_value("<EMAIL:0123456789ab>", "bob@corp.example")
            .with_suggested_tool("file-server.read_file")
    }

    fn gateway(tools: MockToolGateway) -> (Arc<MockToolGateway>, ExecutionGateway) {
        let tools = Arc::new(tools);
        let gateway = ExecutionGateway::new(tools.clone(), Duration::from_secs(5));
        (tools, gateway)
    }

    #[tokio::test]
    async fn test_resolves_tokens_only_at_dispatch() {
        let (tools, gateway) = gateway(MockToolGateway::new(registry()).with_output(
            "file-server.read_file",
            Ok(ToolOutput::Text("127.0.0.1 localhost".into())),
        ));
        let response = LlmStepResponse::new(vec![
            ToolCall::new("file-server", "read_file")
                .with_arg("path", "[FILE_PATH]")
                .with_arg("notify", json!(["<EMAIL:0123456789ab>", "ops"]))
                .with_arg("note", "see [FILE_PATH] later"),
        ]);

        let records = gateway
            .execute(&sub_prompt(), &response, &registry())
            .await
            .unwrap();
        assert_eq!(records[0].output, "127.0.0.1 localhost");

        let calls = tools.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].2,
            json!({
                "path": "/etc/hosts",
                "notify": ["bob@corp.example", "ops"],
                "note": "see [FILE_PATH] later"
            })
        );
    }

    #[tokio::test]
    async fn test_unregistered_tool_never_dispatched() {
        let (tools, gateway) = gateway(MockToolGateway::new(registry()));
        let response = LlmStepResponse::new(vec![
            ToolCall::new("file-server", "read_file"),
            ToolCall::new("nuke-server", "launch"),
        ]);
        let err = gateway
            .execute(&sub_prompt(), &response, &registry())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ExecuteStepError::UnauthorizedTool {
                sub_prompt_id: 1,
                capability: "nuke-server.launch".to_string()
            }
        );
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_registered_but_not_suggested_is_unauthorized() {
        let (tools, gateway) = gateway(MockToolGateway::new(registry()));
        let response = LlmStepResponse::new(vec![ToolCall::new("file-server", "write_file")]);
        let err = gateway
            .execute(&sub_prompt(), &response, &registry())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), StepFailureKind::Unauthorized);
        assert!(tools.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unavailable_server_reported() {
        let (_, gateway) = gateway(MockToolGateway::new(registry()).with_output(
            "file-server.read_file",
            Err(ToolGatewayError::Unavailable {
                server: "file-server".into(),
                message: "spawn failed".into(),
            }),
        ));
        let response = LlmStepResponse::new(vec![ToolCall::new("file-server", "read_file")]);
        let err = gateway
            .execute(&sub_prompt(), &response, &registry())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), StepFailureKind::ToolUnavailable);
        assert!(err.to_string().contains("spawn failed"));
    }

    #[tokio::test]
    async fn test_tool_failure_is_distinct() {
        let (_, gateway) = gateway(MockToolGateway::new(registry()).with_output(
            "file-server.read_file",
            Err(ToolGatewayError::ToolFailed {
                server: "file-server".into(),
                tool: "read_file".into(),
                message: "permission denied".into(),
            }),
        ));
        let response = LlmStepResponse::new(vec![ToolCall::new("file-server", "read_file")]);
        let err = gateway
            .execute(&sub_prompt(), &response, &registry())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), StepFailureKind::ToolFailed);
    }

    #[tokio::test]
    async fn test_output_schema_enforced() {
        let schema_sub = sub_prompt().with_output_schema(json!({
            "type": "object",
            "required": ["lines"],
            "properties": {"lines": {"type": "integer"}}
        }));
        let response = LlmStepResponse::new(vec![ToolCall::new("file-server", "read_file")]);

        let (_, ok_gateway) = gateway(MockToolGateway::new(registry()).with_output(
            "file-server.read_file",
            Ok(ToolOutput::Text(r#"{"lines": 3}"#.into())),
        ));
        assert!(ok_gateway.execute(&schema_sub, &response, &registry()).await.is_ok());

        let (_, bad_gateway) = gateway(MockToolGateway::new(registry()).with_output(
            "file-server.read_file",
            Ok(ToolOutput::Text("three lines".into())),
        ));
        let err = bad_gateway
            .execute(&schema_sub, &response, &registry())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), StepFailureKind::OutputSchemaViolation);
    }

    #[tokio::test]
    async fn test_no_content_uses_sentinel() {
        let (_, gateway) = gateway(MockToolGateway::new(registry()));
        let response = LlmStepResponse::new(vec![ToolCall::new("file-server", "read_file")]);
        let records = gateway
            .execute(&sub_prompt(), &response, &registry())
            .await
            .unwrap();
        assert_eq!(
            records[0].output,
            crate::ports::tool_gateway::NO_CONTENT_SENTINEL
        );
    }

    #[tokio::test]
    async fn test_empty_response_dispatches_nothing() {
        let (tools, gateway) = gateway(MockToolGateway::new(registry()));
        let records = gateway
            .execute(&sub_prompt(), &LlmStepResponse::empty(), &registry())
            .await
            .unwrap();
        assert!(records.is_empty());
        assert!(tools.calls().is_empty());
    }
}
