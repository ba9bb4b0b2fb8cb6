//! Step Executor
//!
//! Asks a freshly created executor session for the tool calls of one
//! sub-prompt. The session sees only that sub-prompt's content and its
//! suggested tools, and is closed before the next sub-prompt starts.
//!
//! Nothing here fails: a broken session, a timeout or unusable output all
//! degrade to an empty [`LlmStepResponse`].

use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, event_type,
};
use crate::ports::llm_gateway::LlmGateway;
use serde_json::json;
use shardguard_domain::util::truncate_str;
use shardguard_domain::{LlmStepResponse, Model, PromptTemplate, parse_tool_intents};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Bytes of unusable executor output kept in debug logs.
const OUTPUT_PREVIEW_BYTES: usize = 200;

/// The Step Executor
pub struct StepExecutor {
    gateway: Arc<dyn LlmGateway>,
    model: Model,
    timeout: Duration,
    logger: Arc<dyn ConversationLogger>,
}

impl StepExecutor {
    pub fn new(gateway: Arc<dyn LlmGateway>, model: Model, timeout: Duration) -> Self {
        Self {
            gateway,
            model,
            timeout,
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Propose tool calls for one sub-prompt.
    pub async fn run_step(
        &self,
        sub_prompt_id: u32,
        content: &str,
        suggested_tools: &[String],
    ) -> LlmStepResponse {
        let prompt = PromptTemplate::execution(content, suggested_tools);

        let session =
            match tokio::time::timeout(self.timeout, self.gateway.create_session(&self.model))
                .await
            {
                Ok(Ok(session)) => session,
                Ok(Err(e)) => {
                    warn!(sub_prompt_id, error = %e, "Could not open executor session");
                    return LlmStepResponse::empty();
                }
                Err(_) => {
                    warn!(sub_prompt_id, "Timed out opening executor session");
                    return LlmStepResponse::empty();
                }
            };

        self.logger.log(ConversationEvent::new(
            event_type::EXECUTOR_REQUEST,
            json!({ "sub_prompt_id": sub_prompt_id, "prompt": prompt }),
        ));

        let result = tokio::time::timeout(self.timeout, session.send(&prompt)).await;
        session.close().await;

        let raw = match result {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                warn!(sub_prompt_id, error = %e, "Executor request failed");
                return LlmStepResponse::empty();
            }
            Err(_) => {
                warn!(
                    sub_prompt_id,
                    timeout_secs = self.timeout.as_secs(),
                    "Executor request timed out"
                );
                return LlmStepResponse::empty();
            }
        };

        let response = parse_tool_intents(&raw);
        self.logger.log(ConversationEvent::new(
            event_type::EXECUTOR_RESPONSE,
            json!({
                "sub_prompt_id": sub_prompt_id,
                "response": raw,
                "tool_calls": response.len(),
            }),
        ));
        if response.is_empty() && !raw.trim().is_empty() {
            debug!(
                sub_prompt_id,
                output = truncate_str(raw.trim(), OUTPUT_PREVIEW_BYTES),
                "Executor output yielded no valid tool calls"
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::GatewayError;
    use crate::use_cases::test_support::ScriptedGateway;

    fn executor(gateway: Arc<ScriptedGateway>) -> StepExecutor {
        StepExecutor::new(gateway, Model::new("exec").unwrap(), Duration::from_secs(5))
    }

    fn tools() -> Vec<String> {
        vec!["file-server.read_file".to_string()]
    }

    #[tokio::test]
    async fn test_fenced_output_parsed() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(
            "```json\n[{\"server\":\"file-server\",\"tool\":\"read_file\",\"args\":{}}]\n```"
                .to_string(),
        )]));
        let response = executor(gateway.clone())
            .run_step(1, "Read [FILE_PATH]", &tools())
            .await;
        assert_eq!(response.len(), 1);
        assert_eq!(response.tool_calls[0].server, "file-server");
        assert!(gateway.all_sessions_closed());
    }

    #[tokio::test]
    async fn test_refusal_is_empty() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok("I cannot comply.".to_string())]));
        assert!(executor(gateway).run_step(1, "do it", &tools()).await.is_empty());
    }

    #[tokio::test]
    async fn test_session_error_is_empty() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Err(GatewayError::Timeout)]));
        assert!(executor(gateway).run_step(1, "do it", &tools()).await.is_empty());
    }

    #[tokio::test]
    async fn test_timeout_is_empty_and_session_closed() {
        let gateway = Arc::new(
            ScriptedGateway::new(vec![Ok("[]".to_string())]).with_delay(Duration::from_millis(200)),
        );
        let executor = StepExecutor::new(
            gateway.clone(),
            Model::new("exec").unwrap(),
            Duration::from_millis(20),
        );
        assert!(executor.run_step(1, "do it", &tools()).await.is_empty());
        assert!(gateway.all_sessions_closed());
    }

    #[tokio::test]
    async fn test_each_step_gets_fresh_session_and_isolated_prompt() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok("[]".to_string()),
            Ok("[]".to_string()),
        ]));
        let executor = executor(gateway.clone());
        executor.run_step(1, "Read [FILE_PATH]", &tools()).await;
        executor
            .run_step(2, "Summarise the notes", &["file-server.write_file".to_string()])
            .await;

        assert_eq!(gateway.sessions_created(), 2);
        let prompts = gateway.prompts();
        assert!(prompts[0].contains("Read [FILE_PATH]"));
        assert!(!prompts[1].contains("Read [FILE_PATH]"));
        assert!(!prompts[1].contains("read_file"));
        assert!(prompts[1].contains("file-server.write_file"));
    }
}
