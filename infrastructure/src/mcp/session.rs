//! MCP client session: handshake, tool listing and tool calls.

use super::error::{McpError, Result};
use super::protocol::{
    CallToolResult, JsonRpcNotification, JsonRpcRequest, ListToolsResult, ToolDescriptor,
};
use super::transport::McpConnection;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::debug;

/// One MCP client session. Every request is bounded by `timeout`.
pub struct McpSession<R, W> {
    connection: McpConnection<R, W>,
    timeout: Duration,
}

impl<R, W> McpSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(connection: McpConnection<R, W>, timeout: Duration) -> Self {
        Self {
            connection,
            timeout,
        }
    }

    async fn request(&mut self, request: JsonRpcRequest) -> Result<Value> {
        tokio::time::timeout(self.timeout, self.connection.request(&request))
            .await
            .map_err(|_| McpError::Timeout)?
    }

    async fn request_as<T: DeserializeOwned>(&mut self, request: JsonRpcRequest) -> Result<T> {
        let result = self.request(request).await?;
        serde_json::from_value(result.clone()).map_err(|e| McpError::ParseError {
            error: e.to_string(),
            raw: result.to_string(),
        })
    }

    /// `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&mut self) -> Result<Value> {
        let result = self.request(JsonRpcRequest::initialize()).await?;
        if let Some(info) = result.get("serverInfo") {
            debug!("Connected to tool server {}", info);
        }
        self.connection
            .notify(&JsonRpcNotification::initialized())
            .await?;
        Ok(result)
    }

    pub async fn list_tools(&mut self) -> Result<Vec<ToolDescriptor>> {
        let result: ListToolsResult = self.request_as(JsonRpcRequest::list_tools()).await?;
        Ok(result.tools)
    }

    pub async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<CallToolResult> {
        self.request_as(JsonRpcRequest::call_tool(name, arguments))
            .await
    }
}
