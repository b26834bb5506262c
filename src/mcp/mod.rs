//! MCP surface: JSON-RPC protocol types, method handler and transports.

pub mod handler;
pub mod http;
pub mod protocol;
pub mod stdio;

pub use handler::McpHandler;
pub use http::HttpTransport;
pub use protocol::{JsonRpcError, JsonRpcId, JsonRpcRequest, JsonRpcResponse};
pub use stdio::{serve_lines, serve_stdio};
