//! MCP server loop: newline-delimited JSON-RPC over stdio
//!
//! Each request runs on its own task; responses funnel through a channel
//! to a single writer so output lines never interleave.

use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::protocol::{ErrorCode, JsonRpcRequest, JsonRpcResponse};
use crate::tools::{schema::normalize_arguments, ToolError, ToolSurface};

pub const DEFAULT_PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "netwrix-auditor-mcp";

pub struct McpServer {
    tools: ToolSurface,
}

impl McpServer {
    pub fn new(tools: ToolSurface) -> Self {
        Self { tools }
    }

    /// Serve until `reader` reaches EOF and every in-flight call has answered.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();

        let writer_task = tokio::spawn(async move {
            while let Some(response) = rx.recv().await {
                let mut line = match serde_json::to_vec(&response) {
                    Ok(line) => line,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize response");
                        continue;
                    }
                };
                line.push(b'\n');
                writer.write_all(&line).await?;
                writer.flush().await?;
            }
            writer.shutdown().await
        });

        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
            if line.trim().is_empty() {
                continue;
            }
            let server = Arc::clone(&self);
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(response) = server.handle_line(&line).await {
                    let _ = tx.send(response);
                }
            });
        }
        info!("Input closed, waiting for in-flight requests");
        drop(tx);

        writer_task
            .await
            .context("Writer task panicked")?
            .context("Failed to write stdout")?;
        Ok(())
    }

    pub async fn serve_stdio(self: Arc<Self>) -> Result<()> {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.serve(stdin, tokio::io::stdout()).await
    }

    /// Handle one input line. `None` for notifications.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Unparsable JSON-RPC message");
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError,
                    format!("Parse error: {e}"),
                ));
            }
        };
        let id = value.get("id").cloned();
        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    id.unwrap_or(Value::Null),
                    ErrorCode::InvalidRequest,
                    format!("Invalid request: {e}"),
                ))
            }
        };
        self.handle(request).await
    }

    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "Dispatching");
        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }
        let id = request.id.clone().unwrap_or(Value::Null);
        if !request.has_supported_version() {
            return Some(JsonRpcResponse::failure(
                id,
                ErrorCode::InvalidRequest,
                format!(
                    "Unsupported jsonrpc version: {}",
                    request.jsonrpc.as_deref().unwrap_or_default()
                ),
            ));
        }

        let response = match request.method.as_str() {
            "initialize" => JsonRpcResponse::success(id, self.initialize(request.params.as_ref())),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.list_tools(id),
            "tools/call" => self.call_tool(id, request.params).await,
            other => JsonRpcResponse::failure(
                id,
                ErrorCode::MethodNotFound,
                format!("Method not found: {other}"),
            ),
        };
        Some(response)
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);
        info!("Client initialized with protocol version {version}");
        json!({
            "protocolVersion": version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") }
        })
    }

    fn list_tools(&self, id: Value) -> JsonRpcResponse {
        match serde_json::to_value(self.tools.list_tools()) {
            Ok(tools) => JsonRpcResponse::success(id, json!({ "tools": tools })),
            Err(e) => {
                error!(error = %e, "Failed to serialize tool definitions");
                JsonRpcResponse::failure(
                    id,
                    ErrorCode::InternalError,
                    format!("Internal error: {e}"),
                )
            }
        }
    }

    async fn call_tool(&self, id: Value, params: Option<Value>) -> JsonRpcResponse {
        let mut params = params.unwrap_or(Value::Null);
        let Some(name) = params.get("name").and_then(Value::as_str).map(str::to_string) else {
            return JsonRpcResponse::failure(id, ErrorCode::InvalidParams, "Missing tool name");
        };
        let arguments = normalize_arguments(params.get_mut("arguments").map(Value::take));

        match self.tools.call(&name, arguments).await {
            Ok(output) => JsonRpcResponse::success(id, tool_result(&output.text, output.is_error)),
            Err(ToolError::InvalidArguments(message)) => {
                warn!(tool = %name, "Invalid arguments: {message}");
                JsonRpcResponse::success(id, tool_result(&message, true))
            }
            Err(e @ ToolError::UnknownTool(_)) => {
                JsonRpcResponse::failure(id, ErrorCode::InvalidParams, e.to_string())
            }
        }
    }
}

fn tool_result(text: &str, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error
    })
}
