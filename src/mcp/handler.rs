//! Method dispatch shared by every transport.

use crate::backend::Row;
use crate::envelope::is_success;
use crate::mcp::protocol::{
    error_codes, methods, negotiate_version, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION,
};
use crate::tools::service::SERVICE_NAME;
use crate::tools::Hub;
use crate::types::Error;
use serde_json::{json, Value};
use std::sync::Arc;

/// Turns JSON-RPC requests into responses against a [`Hub`].
#[derive(Debug, Clone)]
pub struct McpHandler {
    hub: Arc<Hub>,
}

impl McpHandler {
    pub fn new(hub: Arc<Hub>) -> Self {
        Self { hub }
    }

    pub fn hub(&self) -> &Hub {
        &self.hub
    }

    /// Handle one serialized message. `None` when no reply is due.
    pub async fn handle_raw(&self, message: &str) -> Option<String> {
        let response = match serde_json::from_str::<JsonRpcRequest>(message) {
            Ok(request) => self.handle(request).await?,
            Err(err) => {
                tracing::warn!(error = %err, "unparsable JSON-RPC message");
                JsonRpcResponse::parse_error(&err)
            }
        };
        match serde_json::to_string(&response) {
            Ok(text) => Some(text),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize response");
                None
            }
        }
    }

    /// Handle one request. Notifications produce no response.
    pub async fn handle(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            if request.method == methods::INITIALIZED {
                tracing::info!("client initialized");
            } else if !request.method.starts_with(methods::NOTIFICATION_PREFIX) {
                tracing::debug!(method = %request.method, "ignoring request without id");
            }
            return None;
        }

        let JsonRpcRequest { jsonrpc, id, method, params } = request;
        if jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                id,
                error_codes::INVALID_REQUEST,
                format!("Unsupported jsonrpc version '{jsonrpc}'"),
            ));
        }

        let result = match method.as_str() {
            methods::INITIALIZE => Ok(self.initialize(params.as_ref())),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => Ok(json!({ "tools": self.hub.catalog().definitions() })),
            methods::TOOLS_CALL => self.call_tool(params).await,
            other => Err((error_codes::METHOD_NOT_FOUND, format!("Method not found: {other}"))),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err((code, message)) => JsonRpcResponse::error(id, code, message),
        })
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let version = negotiate_version(requested);
        tracing::info!(requested, negotiated = version, "initialize");

        json!({
            "protocolVersion": version,
            "capabilities": { "tools": { "listChanged": false } },
            "serverInfo": { "name": SERVICE_NAME, "version": env!("CARGO_PKG_VERSION") },
            "instructions": "Read-only access to Postgres, MySQL, Neo4j and Qdrant. \
                             Query tools accept SELECT (SQL) or MATCH/RETURN/WITH/UNWIND/CALL (Cypher) only.",
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> std::result::Result<Value, (i32, String)> {
        let mut params = match params {
            Some(Value::Object(map)) => map,
            _ => return Err((error_codes::INVALID_PARAMS, "tools/call requires an object with 'name'".into())),
        };
        let name = match params.remove("name") {
            Some(Value::String(name)) => name,
            _ => return Err((error_codes::INVALID_PARAMS, "tools/call requires a string 'name'".into())),
        };
        let args = match params.remove("arguments") {
            None | Some(Value::Null) => Row::new(),
            Some(Value::Object(args)) => args,
            Some(_) => return Err((error_codes::INVALID_PARAMS, "'arguments' must be an object".into())),
        };

        match self.hub.call(&name, args).await {
            Ok(envelope) => Ok(tool_result(envelope)),
            Err(err) => Err((error_code(&err), err.to_string())),
        }
    }
}

/// MCP `CallToolResult` wrapping an envelope.
fn tool_result(envelope: Value) -> Value {
    let text = serde_json::to_string_pretty(&envelope).unwrap_or_else(|_| envelope.to_string());
    json!({
        "content": [{ "type": "text", "text": text }],
        "structuredContent": envelope,
        "isError": !is_success(&envelope),
    })
}

fn error_code(err: &Error) -> i32 {
    match err {
        Error::NotFound(_) | Error::Validation(_) => error_codes::INVALID_PARAMS,
        Error::Connection(_) => error_codes::BACKEND_UNAVAILABLE,
        _ => error_codes::INTERNAL_ERROR,
    }
}
