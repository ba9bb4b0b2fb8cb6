//! Line-framed JSON-RPC transport and tool-server process management.
//!
//! [`McpConnection`] does the framing over any buffered reader / writer pair
//! so it can be driven in-memory; [`StdioTransport`] owns the spawned server
//! process and kills it when dropped.

use super::error::{McpError, Result};
use super::protocol::{
    JsonRpcErrorReply, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, MessageKind,
    classify_message,
};
use super::session::McpSession;
use crate::config::FileToolServerConfig;
use serde::Serialize;
use serde_json::Value;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tracing::{debug, trace};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Newline-delimited JSON-RPC over a reader / writer pair.
pub struct McpConnection<R, W> {
    reader: R,
    writer: W,
    line: String,
}

impl<R, W> McpConnection<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            line: String::new(),
        }
    }

    async fn write_frame<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut json = serde_json::to_string(message)?;
        trace!("-> {}", json);
        json.push('\n');
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next JSON frame. Blank and non-JSON lines are skipped.
    async fn read_frame(&mut self) -> Result<Value> {
        loop {
            self.line.clear();
            let bytes_read = self.reader.read_line(&mut self.line).await?;
            if bytes_read == 0 {
                return Err(McpError::TransportClosed);
            }

            let trimmed = self.line.trim();
            if trimmed.is_empty() {
                continue;
            }
            trace!("<- {}", trimmed);

            match serde_json::from_str::<Value>(trimmed) {
                Ok(value) => return Ok(value),
                Err(e) => debug!("Skipping non-JSON line from tool server: {}", e),
            }
        }
    }

    pub async fn notify(&mut self, notification: &JsonRpcNotification) -> Result<()> {
        self.write_frame(notification).await
    }

    /// Send a request and wait for the response with the same id.
    ///
    /// Notifications are ignored and server-initiated requests are answered
    /// with "method not found" while waiting.
    pub async fn request(&mut self, request: &JsonRpcRequest) -> Result<Value> {
        debug!("Sending {} (id={})", request.method, request.id);
        self.write_frame(request).await?;

        loop {
            let frame = self.read_frame().await?;
            match classify_message(&frame) {
                MessageKind::Response { id } if id == request.id => {
                    let response: JsonRpcResponse =
                        serde_json::from_value(frame.clone()).map_err(|e| {
                            McpError::ParseError {
                                error: e.to_string(),
                                raw: frame.to_string(),
                            }
                        })?;
                    if let Some(error) = response.error {
                        return Err(McpError::RpcError {
                            code: error.code,
                            message: error.message,
                        });
                    }
                    return response.result.ok_or_else(|| {
                        McpError::UnexpectedResponse(format!(
                            "Response to {} has neither result nor error",
                            request.method
                        ))
                    });
                }
                MessageKind::Response { id } => {
                    debug!("Ignoring response for unknown request id {}", id);
                }
                MessageKind::IncomingRequest { id, method } => {
                    debug!("Rejecting server request '{}' (id={})", method, id);
                    self.write_frame(&JsonRpcErrorReply::method_not_found(id, &method))
                        .await?;
                }
                MessageKind::Notification => {}
            }
        }
    }
}

pub type StdioSession = McpSession<BufReader<ChildStdout>, ChildStdin>;

/// A spawned tool server speaking MCP over its stdin/stdout.
///
/// The child is killed on drop, so every exit path tears the server down.
pub struct StdioTransport {
    child: Child,
    session: StdioSession,
}

impl StdioTransport {
    pub fn spawn(config: &FileToolServerConfig, timeout: Duration) -> Result<Self> {
        debug!(
            "Spawning tool server '{}': {} {}",
            config.name,
            config.command,
            config.args.join(" ")
        );

        let mut cmd = Command::new(&config.command);
        cmd.args(&config.args)
            .envs(&config.env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::SpawnError(std::io::Error::other("Failed to capture stdin"))
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::SpawnError(std::io::Error::other("Failed to capture stdout"))
        })?;

        let connection = McpConnection::new(BufReader::new(stdout), stdin);
        Ok(Self {
            child,
            session: McpSession::new(connection, timeout),
        })
    }

    pub fn session(&mut self) -> &mut StdioSession {
        &mut self.session
    }

    /// Kill the server and reap it.
    pub async fn shutdown(mut self) {
        let _ = self.child.start_kill();
        if tokio::time::timeout(SHUTDOWN_GRACE, self.child.wait())
            .await
            .is_err()
        {
            debug!("Tool server did not exit within {:?}", SHUTDOWN_GRACE);
        }
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}
