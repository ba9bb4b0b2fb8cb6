//! Plan domain module
//!
//! A [`Plan`] is the planner's decomposition of one user request into
//! ordered [`SubPrompt`]s. Plans are parsed fail-closed from planner output
//! ([`parser`]), redacted, checked for reference consistency
//! ([`reference`]) and validated against the capability registry before
//! anything runs.

pub mod entities;
pub mod error;
pub mod output_schema;
pub mod parser;
pub mod reference;

pub use entities::{Plan, SubPrompt};
pub use error::PlanParseError;
pub use parser::{extract_plan_json, parse_plan, parse_plan_json};
pub use reference::{find_references, is_reference_token};
