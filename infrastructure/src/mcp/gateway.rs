//! Tool Gateway backed by MCP stdio servers.
//!
//! Each operation spawns the configured server, performs the handshake,
//! issues one request and shuts the server down again. No state is kept
//! between calls.

use super::error::McpError;
use super::protocol::{CallToolResult, ToolDescriptor};
use super::transport::StdioTransport;
use crate::config::FileToolServerConfig;
use async_trait::async_trait;
use serde_json::Value;
use shardguard_application::ports::tool_gateway::{ToolGatewayError, ToolGatewayPort, ToolOutput};
use shardguard_domain::{CapabilityEntry, CapabilityRegistry};
use std::error::Error;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_SERVER_DESCRIPTION: &str = "MCP Server";

/// `ToolGatewayPort` implementation over configured MCP servers.
pub struct McpToolGateway {
    servers: Vec<FileToolServerConfig>,
    timeout: Duration,
}

impl McpToolGateway {
    pub fn new(servers: Vec<FileToolServerConfig>, timeout: Duration) -> Self {
        Self { servers, timeout }
    }

    pub fn servers(&self) -> &[FileToolServerConfig] {
        &self.servers
    }

    fn server(&self, name: &str) -> Result<&FileToolServerConfig, ToolGatewayError> {
        self.servers
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ToolGatewayError::UnknownServer(name.to_string()))
    }

    async fn open(&self, server: &FileToolServerConfig) -> Result<StdioTransport, McpError> {
        let mut transport = StdioTransport::spawn(server, self.timeout)?;
        transport.session().initialize().await?;
        Ok(transport)
    }

    async fn fetch_tools(
        &self,
        server: &FileToolServerConfig,
    ) -> Result<Vec<ToolDescriptor>, McpError> {
        let mut transport = self.open(server).await?;
        let result = transport.session().list_tools().await;
        transport.shutdown().await;
        result
    }

    async fn invoke(
        &self,
        server: &FileToolServerConfig,
        tool: &str,
        args: Value,
    ) -> Result<CallToolResult, McpError> {
        let mut transport = self.open(server).await?;
        let result = transport.session().call_tool(tool, args).await;
        transport.shutdown().await;
        result
    }

    fn map_error(&self, server: &str, tool: &str, err: McpError) -> ToolGatewayError {
        warn!(
            server = server,
            tool = tool,
            "Tool server request failed: {}",
            error_chain(&err)
        );
        match err {
            McpError::Timeout => ToolGatewayError::Timeout {
                server: server.to_string(),
                seconds: self.timeout.as_secs(),
            },
            McpError::RpcError { code, message } => ToolGatewayError::ToolFailed {
                server: server.to_string(),
                tool: tool.to_string(),
                message: format!("{} (code {})", message, code),
            },
            other => ToolGatewayError::Unavailable {
                server: server.to_string(),
                message: error_chain(&other),
            },
        }
    }
}

/// Map a `tools/call` result to the port's output type.
pub fn into_tool_output(
    server: &str,
    tool: &str,
    result: CallToolResult,
) -> Result<ToolOutput, ToolGatewayError> {
    let text = result.text();
    if result.is_error {
        return Err(ToolGatewayError::ToolFailed {
            server: server.to_string(),
            tool: tool.to_string(),
            message: text.unwrap_or_else(|| "Tool reported an error".to_string()),
        });
    }
    Ok(match text {
        Some(text) => ToolOutput::Text(text),
        None => ToolOutput::NoContent,
    })
}

/// Build registry entries for one server's tools.
pub fn capability_entries(server: &str, tools: Vec<ToolDescriptor>) -> Vec<CapabilityEntry> {
    tools
        .into_iter()
        .map(|tool| {
            let entry = CapabilityEntry::new(
                server,
                tool.name,
                tool.description.unwrap_or_else(|| "No description".to_string()),
            );
            match tool.input_schema {
                Some(schema) => entry.with_input_schema(schema),
                None => entry,
            }
        })
        .collect()
}

/// Render an error with its whole `source()` chain.
pub fn error_chain(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl ToolGatewayPort for McpToolGateway {
    async fn list_capabilities(&self) -> Result<CapabilityRegistry, ToolGatewayError> {
        let mut registry = CapabilityRegistry::new();

        for server in &self.servers {
            match self.fetch_tools(server).await {
                Ok(tools) => {
                    debug!("Tool server '{}' offers {} tools", server.name, tools.len());
                    registry.register_server(
                        &server.name,
                        server
                            .description
                            .as_deref()
                            .unwrap_or(DEFAULT_SERVER_DESCRIPTION),
                    );
                    for entry in capability_entries(&server.name, tools) {
                        registry.register(entry);
                    }
                }
                Err(e) => {
                    warn!(
                        server = %server.name,
                        "Skipping unreachable tool server: {}",
                        error_chain(&e)
                    );
                }
            }
        }

        info!(
            "Capability registry: {} tools from {} servers",
            registry.len(),
            registry.servers().len()
        );
        Ok(registry)
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        args: Value,
    ) -> Result<ToolOutput, ToolGatewayError> {
        let config = self.server(server)?;
        let result = self
            .invoke(config, tool, args)
            .await
            .map_err(|e| self.map_error(server, tool, e))?;
        into_tool_output(server, tool, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn server(name: &str, command: &str) -> FileToolServerConfig {
        FileToolServerConfig {
            name: name.to_string(),
            command: command.to_string(),
            args: Vec::new(),
            env: Default::default(),
            description: None,
        }
    }

    fn call_result(value: Value) -> CallToolResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_into_tool_output_text() {
        let output = into_tool_output(
            "file-operations",
            "read_file",
            call_result(json!({"content": [{"type": "text", "text": "hello"}]})),
        )
        .unwrap();
        assert_eq!(output, ToolOutput::Text("hello".to_string()));
    }

    #[test]
    fn test_into_tool_output_no_content() {
        let output =
            into_tool_output("s", "t", call_result(json!({"content": []}))).unwrap();
        assert_eq!(output, ToolOutput::NoContent);
    }

    #[test]
    fn test_into_tool_output_error_flag() {
        let err = into_tool_output(
            "s",
            "t",
            call_result(json!({"content": [{"type": "text", "text": "denied"}], "isError": true})),
        )
        .unwrap_err();
        assert_eq!(
            err,
            ToolGatewayError::ToolFailed {
                server: "s".to_string(),
                tool: "t".to_string(),
                message: "denied".to_string()
            }
        );
    }

    #[test]
    fn test_capability_entries() {
        let tools: Vec<ToolDescriptor> = serde_json::from_value(json!([
            {"name": "read_file", "description": "Read a file",
             "inputSchema": {"type": "object", "properties": {"path": {"type": "string"}}}},
            {"name": "list_dir"}
        ]))
        .unwrap();

        let entries = capability_entries("file-operations", tools);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id().to_string(), "file-operations.read_file");
        assert!(entries[0].input_schema.is_some());
        assert_eq!(entries[1].description, "No description");
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "python not found");
        let err = McpError::SpawnError(io);
        let chain = error_chain(&err);
        assert!(chain.contains("Failed to spawn tool server"));
        assert!(chain.contains("python not found"));
    }

    #[tokio::test]
    async fn test_unknown_server() {
        let gateway =
            McpToolGateway::new(vec![server("file-operations", "true")], Duration::from_secs(1));
        let err = gateway
            .call_tool("email-operations", "send_email", json!({}))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ToolGatewayError::UnknownServer("email-operations".to_string())
        );
    }
}
