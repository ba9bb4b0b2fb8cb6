//! Prompt domain
//!
//! Fixed templates for the planner and the per-step executor.

mod template;

pub use template::PromptTemplate;
