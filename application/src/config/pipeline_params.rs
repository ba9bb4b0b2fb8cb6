//! Pipeline parameters: use case loop control.
//!
//! [`PipelineParams`] groups the static parameters that bound the planning
//! loop and every external wait. These are application-layer concerns, not
//! domain policy.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Loop bounds and timeouts for a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineParams {
    /// Planning attempts before giving up (attempts are numbered from 1).
    pub max_plan_attempts: u32,
    /// Bound on a single planner call.
    pub planner_timeout: Duration,
    /// Bound on a single executor call.
    pub executor_timeout: Duration,
    /// Bound on a single tool call, including server start-up.
    pub tool_timeout: Duration,
    /// Reject plans containing a sub-prompt with no suggested tools.
    ///
    /// Off by default: a sub-prompt may legitimately need no tools.
    pub require_tools_for_every_step: bool,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            max_plan_attempts: 5,
            planner_timeout: Duration::from_secs(120),
            executor_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
            require_tools_for_every_step: false,
        }
    }
}

impl PipelineParams {
    // ==================== Builder Methods ====================

    pub fn with_max_plan_attempts(mut self, attempts: u32) -> Self {
        self.max_plan_attempts = attempts.max(1);
        self
    }

    pub fn with_planner_timeout(mut self, timeout: Duration) -> Self {
        self.planner_timeout = timeout;
        self
    }

    pub fn with_executor_timeout(mut self, timeout: Duration) -> Self {
        self.executor_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_require_tools_for_every_step(mut self, require: bool) -> Self {
        self.require_tools_for_every_step = require;
        self
    }
}
