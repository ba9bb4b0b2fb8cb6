//! Application layer for shardguard
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::PipelineParams;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    llm_gateway::{GatewayError, LlmGateway, LlmSession},
    progress::{NoProgress, ProgressNotifier},
    tool_gateway::{NO_CONTENT_SENTINEL, ToolGatewayError, ToolGatewayPort, ToolOutput},
};
pub use use_cases::execute_step::{ExecuteStepError, ExecutionGateway};
pub use use_cases::planning::{PlanningError, PlanningOrchestrator};
pub use use_cases::run_pipeline::{
    PipelineError, PipelineReport, RunPipelineUseCase, StepFailureKind, StepOutcome, StepReport,
    ToolCallRecord,
};
pub use use_cases::run_step::StepExecutor;
