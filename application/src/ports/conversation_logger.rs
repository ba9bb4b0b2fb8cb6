//! Port for the structured pipeline transcript.
//!
//! Separate from `tracing`: tracing carries human-readable diagnostics, this
//! port records what was sent to and received from models and tool servers
//! in a machine-readable form (JSONL in the default adapter).
//!
//! Only redacted material goes through here. Opaque values and tool outputs
//! are never logged; tool results are recorded by size only.

use serde_json::{Value, json};

/// Event type names.
pub mod event_type {
    pub const PLANNER_REQUEST: &str = "planner_request";
    pub const PLANNER_RESPONSE: &str = "planner_response";
    pub const PLAN_REJECTED: &str = "plan_rejected";
    pub const PLAN_VALIDATED: &str = "plan_validated";
    pub const EXECUTOR_REQUEST: &str = "executor_request";
    pub const EXECUTOR_RESPONSE: &str = "executor_response";
    pub const TOOL_CALL: &str = "tool_call";
    pub const TOOL_RESULT: &str = "tool_result";
}

/// One transcript record: a type tag and a JSON payload.
pub struct ConversationEvent {
    pub event_type: &'static str,
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    pub fn planner_request(attempt: u32, prompt: &str) -> Self {
        Self::new(
            event_type::PLANNER_REQUEST,
            json!({ "attempt": attempt, "prompt": prompt }),
        )
    }

    pub fn planner_response(attempt: u32, response: &str) -> Self {
        Self::new(
            event_type::PLANNER_RESPONSE,
            json!({ "attempt": attempt, "response": response }),
        )
    }

    pub fn tool_result(sub_prompt_id: u32, capability: &str, success: bool, bytes: usize) -> Self {
        Self::new(
            event_type::TOOL_RESULT,
            json!({
                "sub_prompt_id": sub_prompt_id,
                "capability": capability,
                "success": success,
                "bytes": bytes,
            }),
        )
    }
}

/// Port for recording transcript events.
///
/// Synchronous and infallible: a failing log sink must not disturb the
/// pipeline.
pub trait ConversationLogger: Send + Sync {
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}
