//! Streamable HTTP transport (axum).
//!
//! - `POST /mcp`: one JSON-RPC message in, one JSON response out, `202` for
//!   notifications. `initialize` responses carry an `Mcp-Session-Id` header.
//! - `GET /health`: the `health_check` payload.

use crate::mcp::protocol::{methods, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::McpHandler;
use crate::tools::service;
use crate::types::{Result, SessionId};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Routes for the HTTP transport.
pub fn router(handler: Arc<McpHandler>) -> Router {
    Router::new()
        .route("/mcp", post(post_message))
        .route("/health", get(health))
        .with_state(handler)
}

async fn post_message(State(handler): State<Arc<McpHandler>>, body: Bytes) -> Response {
    let request: JsonRpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(err) => {
            tracing::warn!(error = %err, "unparsable JSON-RPC body");
            return (StatusCode::BAD_REQUEST, Json(JsonRpcResponse::parse_error(&err))).into_response();
        }
    };

    let opens_session = request.method == methods::INITIALIZE;
    let Some(reply) = handler.handle(request).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let mut response = Json(reply).into_response();
    if opens_session {
        let session = SessionId::new();
        if let Ok(value) = HeaderValue::from_str(session.as_str()) {
            tracing::info!(session = %session, "session opened");
            response.headers_mut().insert(SESSION_HEADER, value);
        }
    }
    response
}

async fn health(State(handler): State<Arc<McpHandler>>) -> Response {
    Json(service::health_check(handler.hub())).into_response()
}

/// HTTP server with cooperative shutdown.
#[derive(Debug)]
pub struct HttpTransport {
    addr: SocketAddr,
    cancel: CancellationToken,
}

impl HttpTransport {
    pub fn new(addr: SocketAddr, cancel: CancellationToken) -> Self {
        Self { addr, cancel }
    }

    /// Bind the configured address and serve until cancelled.
    pub async fn serve(&self, handler: Arc<McpHandler>) -> Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        self.serve_on(listener, handler).await
    }

    /// Serve on an already bound listener.
    pub async fn serve_on(&self, listener: TcpListener, handler: Arc<McpHandler>) -> Result<()> {
        let local = listener.local_addr()?;
        tracing::info!(addr = %local, "MCP HTTP transport listening on /mcp");
        axum::serve(listener, router(handler))
            .with_graceful_shutdown(self.cancel.clone().cancelled_owned())
            .await?;
        tracing::info!("HTTP transport stopped");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}
