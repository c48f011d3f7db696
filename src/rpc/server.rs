//! Stdio JSON-RPC server — newline-delimited JSON-RPC 2.0 over any
//! async byte stream.
//!
//! Thin glue: decodes requests into engine calls and serializes results
//! back. Invocation outcomes (including tool errors) ride inside a
//! *successful* JSON-RPC response as the serialized `InvocationResult`;
//! only protocol and administration failures become JSON-RPC errors.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::engine::{ClearScope, Engine, InvocationRequest};
use crate::rpc::protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// Maximum bytes per JSON-RPC message (1 MiB).
const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// JSON-RPC front-end over an [`Engine`].
#[derive(Debug)]
pub struct RpcServer {
    engine: Arc<Engine>,
}

#[derive(Debug, Deserialize)]
struct InvokeParams {
    tool: String,
    caller_id: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ToolParams {
    tool: String,
}

#[derive(Debug, Deserialize)]
struct CacheKeyParams {
    tool: String,
    #[serde(default)]
    parameters: Map<String, Value>,
}

impl RpcServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Serve until EOF on the reader.
    pub async fn run<R, W>(&self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut raw = Vec::new();

        loop {
            raw.clear();
            let n = reader.read_until(b'\n', &mut raw).await?;
            if n == 0 {
                break;
            }

            if n > MAX_MESSAGE_BYTES {
                tracing::warn!(bytes = n, "Message too large, rejecting");
                write_response(
                    &mut writer,
                    &JsonRpcResponse::error(None, JsonRpcError::parse_error()),
                )
                .await?;
                continue;
            }

            let trimmed = match std::str::from_utf8(&raw) {
                Ok(s) => s.trim(),
                Err(_) => {
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::error(None, JsonRpcError::parse_error()),
                    )
                    .await?;
                    continue;
                }
            };
            if trimmed.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(trimmed) {
                Ok(r) => r,
                Err(e) => {
                    tracing::debug!(error = %e, "Request parse error");
                    write_response(
                        &mut writer,
                        &JsonRpcResponse::error(None, JsonRpcError::parse_error()),
                    )
                    .await?;
                    continue;
                }
            };

            if request.jsonrpc != "2.0" {
                write_response(
                    &mut writer,
                    &JsonRpcResponse::error(request.id.clone(), JsonRpcError::invalid_request()),
                )
                .await?;
                continue;
            }

            if let Some(response) = self.handle(request).await {
                write_response(&mut writer, &response).await?;
            }
        }

        Ok(())
    }

    async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let id = request.id.clone();
        let params = request.params.unwrap_or(Value::Null);

        let outcome: Result<Value, JsonRpcError> = match request.method.as_str() {
            "tools/invoke" => match serde_json::from_value::<InvokeParams>(params) {
                Ok(p) => {
                    let invocation = InvocationRequest::new(p.tool, p.caller_id)
                        .with_parameters(p.parameters);
                    let result = self.engine.dispatch(invocation).await;
                    serde_json::to_value(&result)
                        .map_err(|e| JsonRpcError::from(&crate::types::Error::from(e)))
                }
                Err(e) => Err(JsonRpcError::invalid_params(e.to_string())),
            },

            "tools/list" => self
                .engine
                .registry()
                .list_tools()
                .map_err(|e| JsonRpcError::from(&e))
                .map(|tools| {
                    serde_json::json!({
                        "tools": tools.iter().map(|t| t.as_ref()).collect::<Vec<_>>(),
                        "count": tools.len(),
                    })
                }),

            "resources/list" => self
                .engine
                .registry()
                .list_resources()
                .map_err(|e| JsonRpcError::from(&e))
                .map(|resources| {
                    serde_json::json!({
                        "resources": resources.iter().map(|r| r.as_ref()).collect::<Vec<_>>(),
                        "count": resources.len(),
                    })
                }),

            "tools/enable" | "tools/disable" => {
                let enabled = request.method == "tools/enable";
                match serde_json::from_value::<ToolParams>(params) {
                    Ok(p) => self
                        .engine
                        .set_tool_enabled(&p.tool, enabled)
                        .map(|_| serde_json::json!({"tool": p.tool, "enabled": enabled}))
                        .map_err(|e| JsonRpcError::from(&e)),
                    Err(e) => Err(JsonRpcError::invalid_params(e.to_string())),
                }
            }

            "cache/invalidate" => match serde_json::from_value::<CacheKeyParams>(params) {
                Ok(p) => self
                    .engine
                    .invalidate_cache(&p.tool, &p.parameters)
                    .await
                    .map(|_| serde_json::json!({"invalidated": true}))
                    .map_err(|e| JsonRpcError::from(&e)),
                Err(e) => Err(JsonRpcError::invalid_params(e.to_string())),
            },

            "cache/clear" => {
                let tool: Option<String> = params
                    .get("tool")
                    .and_then(Value::as_str)
                    .map(String::from);
                let scope = match tool.as_deref() {
                    Some(t) => ClearScope::Tool(t),
                    None => ClearScope::All,
                };
                self.engine
                    .clear_cache(scope)
                    .await
                    .map(|_| serde_json::json!({"cleared": true}))
                    .map_err(|e| JsonRpcError::from(&e))
            }

            "status" => Ok(serde_json::json!({
                "metrics": self.engine.metrics_snapshot(),
                "tools": self.engine.registry().tool_count(),
            })),

            other => Err(JsonRpcError::method_not_found(other)),
        };

        // Notifications get no response
        if id.is_none() {
            return None;
        }

        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }
}

async fn write_response<W: AsyncWrite + Unpin>(
    writer: &mut W,
    response: &JsonRpcResponse,
) -> std::io::Result<()> {
    let out = serde_json::to_string(response)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    writer.write_all(out.as_bytes()).await?;
    writer.write_all(b"\n").await?;
    writer.flush().await?;
    Ok(())
}
