//! Tool domain module
//!
//! Everything the pipeline knows about tools is declared here, independent of
//! how tool servers are reached.
//!
//! ```text
//! ┌────────────────────┐   planner proposes    ┌──────────────────┐
//! │ CapabilityRegistry │◀──── suggested_tools ──│ SubPrompt        │
//! │ (server, tool)     │                        └────────┬─────────┘
//! └─────────┬──────────┘                                 │ executor model
//!           │ authorises                                 ▼
//!           │                                   ┌──────────────────┐
//!           └──────────────────────────────────▶│ LlmStepResponse  │
//!                                               │ [ToolCall, ...]  │
//!                                               └──────────────────┘
//! ```
//!
//! - [`capability`]: registry entries and `server.tool` identifiers
//! - [`entities`]: [`ToolCall`] and [`LlmStepResponse`]
//! - [`intent`]: fail-closed parsing of executor output into tool calls

pub mod capability;
pub mod entities;
pub mod intent;

pub use capability::{CapabilityEntry, CapabilityId, CapabilityRegistry, ServerInfo};
pub use entities::{LlmStepResponse, ToolCall};
pub use intent::parse_tool_intents;
