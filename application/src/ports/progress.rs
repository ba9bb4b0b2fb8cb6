//! Progress notification port
//!
//! Defines the interface for reporting progress while a request moves
//! through planning and execution.

use crate::use_cases::run_pipeline::StepReport;
use shardguard_domain::{Plan, ToolCall};

/// Callback for progress updates during a pipeline run
///
/// Implementations live in the presentation layer. All callbacks default to
/// no-ops. Tool calls are reported before reference resolution, so
/// implementations never see opaque values through this port.
pub trait ProgressNotifier: Send + Sync {
    /// A planning attempt is starting (1-based).
    fn on_planning_attempt(&self, _attempt: u32, _max_attempts: u32) {}

    /// A generated plan was rejected and will be regenerated.
    fn on_plan_rejected(&self, _attempt: u32, _reason: &str) {}

    /// A plan passed validation.
    fn on_plan_ready(&self, _plan: &Plan, _attempts: u32) {}

    /// A sub-prompt is about to be executed.
    fn on_step_start(&self, _sub_prompt_id: u32, _index: usize, _total: usize) {}

    /// The executor proposed a call that is about to be dispatched.
    fn on_tool_call(&self, _sub_prompt_id: u32, _call: &ToolCall) {}

    /// A dispatched call finished.
    fn on_tool_result(&self, _sub_prompt_id: u32, _capability: &str, _success: bool) {}

    /// A sub-prompt finished (in any outcome).
    fn on_step_complete(&self, _report: &StepReport) {}
}

/// No-op progress notifier for when progress reporting is not needed
pub struct NoProgress;

impl ProgressNotifier for NoProgress {}
