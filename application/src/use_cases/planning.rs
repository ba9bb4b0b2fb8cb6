//! Planning Orchestrator
//!
//! Turns a user request into a validated, redacted [`Plan`]:
//!
//! ```text
//! START → PROMPT_FORMATTED → PLAN_GENERATED → PLAN_PARSED → REDACTED → TOOLS_VALIDATED
//!                                  ▲                                        │
//!                                  └──────────── RETRY (attempt ≤ max) ─────┘
//!                                                          └─▶ RETRY_EXHAUSTED
//! ```
//!
//! The request is redacted before it is formatted, so the planner never sees
//! the values the rule set detects. Structural errors in the planner output
//! abort immediately; unregistered tools (and planner failures) consume an
//! attempt and regenerate the whole plan from the same request.

use crate::config::PipelineParams;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger, event_type,
};
use crate::ports::llm_gateway::LlmSession;
use crate::ports::progress::{NoProgress, ProgressNotifier};
use serde_json::json;
use shardguard_domain::{
    CapabilityRegistry, Plan, PlanParseError, PromptTemplate, Redactor, UserRequest,
    find_references, parse_plan, util::truncate_str,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Bytes of unparseable planner output kept in debug logs.
const OUTPUT_PREVIEW_BYTES: usize = 200;

/// Errors that end a planning request
#[derive(Error, Debug)]
pub enum PlanningError {
    /// The planner violated the output contract; not retried.
    #[error("Planner output is structurally invalid: {0}")]
    Structural(#[from] PlanParseError),

    #[error("No valid plan after {attempts} attempts (last problem: {last_reason})")]
    RetriesExhausted { attempts: u32, last_reason: String },
}

/// Why a generated plan was not accepted on a given attempt.
enum Rejection {
    Retry(String),
    Fatal(PlanParseError),
}

/// The Planning Orchestrator
pub struct PlanningOrchestrator {
    redactor: Arc<Redactor>,
    params: PipelineParams,
    logger: Arc<dyn ConversationLogger>,
}

impl PlanningOrchestrator {
    pub fn new(redactor: Arc<Redactor>, params: PipelineParams) -> Self {
        Self {
            redactor,
            params,
            logger: Arc::new(NoConversationLogger),
        }
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Plan with default (no-op) progress
    pub async fn execute(
        &self,
        planner: &dyn LlmSession,
        request: &UserRequest,
        registry: &CapabilityRegistry,
    ) -> Result<Plan, PlanningError> {
        self.execute_with_progress(planner, request, registry, &NoProgress)
            .await
    }

    /// Plan with progress callbacks.
    ///
    /// `planner` is owned by the caller, which is also responsible for
    /// closing it.
    pub async fn execute_with_progress(
        &self,
        planner: &dyn LlmSession,
        request: &UserRequest,
        registry: &CapabilityRegistry,
        progress: &dyn ProgressNotifier,
    ) -> Result<Plan, PlanningError> {
        let redacted = self.redactor.extract(request.content());
        if !redacted.references.is_empty() {
            info!(
                count = redacted.references.len(),
                "Redacted sensitive spans from request"
            );
        }

        let tools = (!registry.is_empty()).then(|| registry.describe());
        let prompt = PromptTemplate::planning(&redacted.text, tools.as_deref());

        let max_attempts = self.params.max_plan_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            progress.on_planning_attempt(attempt, max_attempts);
            debug!(attempt, max_attempts, model = %planner.model(), "Requesting plan");

            match self
                .attempt(planner, attempt, &prompt, &redacted.references, registry)
                .await
            {
                Ok(plan) => {
                    info!(
                        attempt,
                        sub_prompts = plan.sub_prompts.len(),
                        "Plan validated"
                    );
                    self.log_validated(&plan, attempt);
                    progress.on_plan_ready(&plan, attempt);
                    return Ok(plan);
                }
                Err(Rejection::Fatal(e)) => {
                    error!(attempt, error = %e, "Planner output is structurally invalid");
                    return Err(PlanningError::Structural(e));
                }
                Err(Rejection::Retry(reason)) => {
                    warn!(attempt, max_attempts, reason = %reason, "Plan rejected, regenerating");
                    self.logger.log(ConversationEvent::new(
                        event_type::PLAN_REJECTED,
                        json!({ "attempt": attempt, "reason": reason }),
                    ));
                    progress.on_plan_rejected(attempt, &reason);
                    last_reason = reason;
                }
            }
        }

        error!(
            attempts = max_attempts,
            last_reason = %last_reason,
            "Planning retries exhausted"
        );
        Err(PlanningError::RetriesExhausted {
            attempts: max_attempts,
            last_reason,
        })
    }

    /// One pass of PLAN_GENERATED → TOOLS_VALIDATED.
    async fn attempt(
        &self,
        planner: &dyn LlmSession,
        attempt: u32,
        prompt: &str,
        request_references: &BTreeMap<String, String>,
        registry: &CapabilityRegistry,
    ) -> Result<Plan, Rejection> {
        self.logger
            .log(ConversationEvent::planner_request(attempt, prompt));

        let raw = match tokio::time::timeout(self.params.planner_timeout, planner.send(prompt))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => return Err(Rejection::Retry(format!("planner error: {e}"))),
            Err(_) => {
                return Err(Rejection::Retry(format!(
                    "planner timed out after {}s",
                    self.params.planner_timeout.as_secs()
                )));
            }
        };
        self.logger
            .log(ConversationEvent::planner_response(attempt, &raw));

        let mut plan = parse_plan(&raw).map_err(|e| {
            debug!(
                attempt,
                output = truncate_str(raw.trim(), OUTPUT_PREVIEW_BYTES),
                "Unparseable planner output"
            );
            Rejection::Fatal(e)
        })?;
        let known = self.redact_plan(&mut plan, request_references);
        plan.check_references(&known).map_err(Rejection::Fatal)?;

        let violations = self.tool_violations(&plan, registry);
        if violations.is_empty() {
            Ok(plan)
        } else {
            Err(Rejection::Retry(violations.join("; ")))
        }
    }

    /// Redact every text field of the plan, attach the resulting
    /// references to the sub-prompts that mention them and replace opaque
    /// values that are pseudonyms with their true values.
    ///
    /// Returns every reference known at the plan level, used to check
    /// `original_prompt`.
    fn redact_plan(
        &self,
        plan: &mut Plan,
        request_references: &BTreeMap<String, String>,
    ) -> BTreeMap<String, String> {
        let mut known = request_references.clone();

        let original = self.redactor.extract(&plan.original_prompt);
        plan.original_prompt = original.text;
        known.extend(original.references);

        for sub in &mut plan.sub_prompts {
            let extraction = self.redactor.extract(&sub.content);
            sub.content = extraction.text;
            sub.merge_references(extraction.references);

            // Tokens the planner copied from the pre-redacted request.
            let inherited: Vec<(String, String)> = find_references(&sub.content)
                .into_iter()
                .filter(|token| !sub.opaque_values.contains_key(*token))
                .filter_map(|token| {
                    known
                        .get(token)
                        .map(|value| (token.to_string(), value.clone()))
                })
                .collect();
            sub.merge_references(inherited);

            // Planner placeholders mapped to pseudonyms it was shown.
            sub.dereference_values(&known);
        }
        known
    }

    fn tool_violations(&self, plan: &Plan, registry: &CapabilityRegistry) -> Vec<String> {
        let mut violations: Vec<String> = plan
            .unregistered_tools(registry)
            .into_iter()
            .map(|(id, tool)| format!("sub_prompt {id}: unregistered tool '{tool}'"))
            .collect();
        if self.params.require_tools_for_every_step {
            violations.extend(
                plan.sub_prompts_without_tools()
                    .into_iter()
                    .map(|id| format!("sub_prompt {id}: no suggested tools")),
            );
        }
        violations
    }

    fn log_validated(&self, plan: &Plan, attempt: u32) {
        let sub_prompts: Vec<_> = plan
            .sub_prompts
            .iter()
            .map(|s| {
                json!({
                    "id": s.id,
                    "content": s.content,
                    "references": s.opaque_values.keys().collect::<Vec<_>>(),
                    "suggested_tools": s.suggested_tools,
                })
            })
            .collect();
        self.logger.log(ConversationEvent::new(
            event_type::PLAN_VALIDATED,
            json!({
                "attempt": attempt,
                "original_prompt": plan.original_prompt,
                "sub_prompts": sub_prompts,
            }),
        ));
    }
}
