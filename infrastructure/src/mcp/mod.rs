//! MCP (Model Context Protocol) tool-server client.
//!
//! Implements [`ToolGatewayPort`](shardguard_application::ToolGatewayPort)
//! by speaking newline-delimited JSON-RPC 2.0 to tool servers spawned as
//! child processes.
//!
//! ```text
//! McpToolGateway ──spawn──▶ StdioTransport (child process)
//!                               │
//!                               ▼
//!                          McpSession ── initialize ▶ tools/list | tools/call
//!                               │
//!                               ▼
//!                          McpConnection (line framing)
//! ```

pub mod error;
pub mod gateway;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::McpError;
pub use gateway::McpToolGateway;
pub use session::McpSession;
pub use transport::{McpConnection, StdioTransport};
