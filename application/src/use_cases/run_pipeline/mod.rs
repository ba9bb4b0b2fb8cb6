//! Run Pipeline use case
//!
//! Coordinates one user request end to end:
//!
//! ```text
//! registry ← tool gateway
//! plan     ← Planning Orchestrator (planner session opened and closed here)
//! for each sub-prompt, in order:
//!     intents ← Step Executor (fresh executor session)
//!     results ← Execution Gateway
//! ```
//!
//! A failing sub-prompt is recorded and the next one still runs; only
//! planning failure fails the request.

mod types;

pub use types::{
    PipelineError, PipelineReport, StepFailureKind, StepOutcome, StepReport, ToolCallRecord,
};

use crate::ports::llm_gateway::LlmGateway;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use crate::ports::tool_gateway::ToolGatewayPort;
use crate::use_cases::execute_step::ExecutionGateway;
use crate::use_cases::planning::PlanningOrchestrator;
use crate::use_cases::run_step::StepExecutor;
use shardguard_domain::{CapabilityRegistry, Model, Plan, SubPrompt, UserRequest};
use std::sync::Arc;
use tracing::{info, warn};

/// Use case for running a request through the whole pipeline
pub struct RunPipelineUseCase {
    planner: Arc<dyn LlmGateway>,
    planner_model: Model,
    tools: Arc<dyn ToolGatewayPort>,
    orchestrator: PlanningOrchestrator,
    step_executor: StepExecutor,
    execution_gateway: ExecutionGateway,
}

impl RunPipelineUseCase {
    pub fn new(
        planner: Arc<dyn LlmGateway>,
        planner_model: Model,
        tools: Arc<dyn ToolGatewayPort>,
        orchestrator: PlanningOrchestrator,
        step_executor: StepExecutor,
        execution_gateway: ExecutionGateway,
    ) -> Self {
        Self {
            planner,
            planner_model,
            tools,
            orchestrator,
            step_executor,
            execution_gateway,
        }
    }

    /// Plan and execute with default (no-op) progress
    pub async fn execute(&self, request: &UserRequest) -> Result<PipelineReport, PipelineError> {
        self.execute_with_progress(request, &NoProgress).await
    }

    pub async fn execute_with_progress(
        &self,
        request: &UserRequest,
        progress: &dyn ProgressNotifier,
    ) -> Result<PipelineReport, PipelineError> {
        let (plan, registry) = self.plan_with_progress(request, progress).await?;

        let total = plan.sub_prompts.len();
        let mut steps = Vec::with_capacity(total);
        for (index, sub_prompt) in plan.sub_prompts.iter().enumerate() {
            progress.on_step_start(sub_prompt.id, index, total);
            let report = self.run_sub_prompt(sub_prompt, &registry, progress).await;
            progress.on_step_complete(&report);
            steps.push(report);
        }

        let failed = steps.iter().filter(|s| s.outcome.is_failed()).count();
        info!(steps = total, failed, "Pipeline finished");
        Ok(PipelineReport { plan, steps })
    }

    /// Produce a validated plan without executing it.
    pub async fn plan(
        &self,
        request: &UserRequest,
    ) -> Result<(Plan, CapabilityRegistry), PipelineError> {
        self.plan_with_progress(request, &NoProgress).await
    }

    pub async fn plan_with_progress(
        &self,
        request: &UserRequest,
        progress: &dyn ProgressNotifier,
    ) -> Result<(Plan, CapabilityRegistry), PipelineError> {
        let registry = self
            .tools
            .list_capabilities()
            .await
            .map_err(PipelineError::Registry)?;
        if registry.is_empty() {
            warn!("No tool capabilities available; plans may only contain tool-less steps");
        }

        let session = self
            .planner
            .create_session(&self.planner_model)
            .await
            .map_err(PipelineError::PlannerUnavailable)?;
        let planned = self
            .orchestrator
            .execute_with_progress(session.as_ref(), request, &registry, progress)
            .await;
        session.close().await;

        Ok((planned?, registry))
    }

    async fn run_sub_prompt(
        &self,
        sub_prompt: &SubPrompt,
        registry: &CapabilityRegistry,
        progress: &dyn ProgressNotifier,
    ) -> StepReport {
        let proposed = self
            .step_executor
            .run_step(sub_prompt.id, &sub_prompt.content, &sub_prompt.suggested_tools)
            .await;

        let outcome = if proposed.is_empty() {
            StepOutcome::NoAction
        } else {
            match self
                .execution_gateway
                .execute_with_progress(sub_prompt, &proposed, registry, progress)
                .await
            {
                Ok(calls) => StepOutcome::Completed { calls },
                Err(e) => {
                    warn!(sub_prompt_id = sub_prompt.id, error = %e, "Sub-prompt failed");
                    StepOutcome::Failed {
                        kind: e.kind(),
                        message: e.to_string(),
                    }
                }
            }
        };

        StepReport {
            sub_prompt_id: sub_prompt.id,
            content: sub_prompt.content.clone(),
            proposed,
            outcome,
        }
    }
}
