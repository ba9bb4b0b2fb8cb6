//! Type definitions for the RunPipeline use case.

use crate::ports::llm_gateway::GatewayError;
use crate::ports::tool_gateway::ToolGatewayError;
use crate::use_cases::planning::PlanningError;
use serde::Serialize;
use shardguard_domain::{LlmStepResponse, Plan};
use thiserror::Error;

/// Errors that fail the whole request.
///
/// Per-step failures never show up here; they are recorded in the
/// [`PipelineReport`].
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Could not list tool capabilities: {0}")]
    Registry(#[source] ToolGatewayError),

    #[error("Could not open planner session: {0}")]
    PlannerUnavailable(#[source] GatewayError),

    #[error("Planning failed: {0}")]
    Planning(#[from] PlanningError),
}

/// One dispatched tool call that completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub capability: String,
    pub output: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepFailureKind {
    Unauthorized,
    ToolUnavailable,
    ToolFailed,
    OutputSchemaViolation,
}

impl StepFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepFailureKind::Unauthorized => "unauthorized",
            StepFailureKind::ToolUnavailable => "tool_unavailable",
            StepFailureKind::ToolFailed => "tool_failed",
            StepFailureKind::OutputSchemaViolation => "output_schema_violation",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepOutcome {
    /// Every proposed call ran.
    Completed { calls: Vec<ToolCallRecord> },
    /// The executor proposed nothing.
    NoAction,
    Failed { kind: StepFailureKind, message: String },
}

impl StepOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, StepOutcome::Failed { .. })
    }
}

/// What happened to one sub-prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub sub_prompt_id: u32,
    pub content: String,
    pub proposed: LlmStepResponse,
    pub outcome: StepOutcome,
}

/// Result of a full pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub plan: Plan,
    pub steps: Vec<StepReport>,
}

impl PipelineReport {
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.outcome.is_failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed_steps().next().is_some()
    }
}
