//! Application use cases
//!
//! - [`planning`]: Planning Orchestrator: request → validated plan
//! - [`run_step`]: Step Executor: sub-prompt → tool-call intents
//! - [`execute_step`]: Execution Gateway: intents → tool results
//! - [`run_pipeline`]: all of the above for one request

pub mod execute_step;
pub mod planning;
pub mod run_pipeline;
pub mod run_step;

#[cfg(test)]
pub(crate) mod test_support;
