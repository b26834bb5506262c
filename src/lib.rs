//! # bigtorig-mcp-hub
//!
//! An MCP (Model Context Protocol) server that exposes four database backends
//! as one set of tools:
//! - PostgreSQL and MySQL through `sqlx`
//! - Neo4j through its HTTP transactional endpoint
//! - Qdrant through its REST API
//!
//! ## Architecture
//!
//! ```text
//!   stdio / HTTP ──▶ McpHandler ──tools/call──▶ Hub ──▶ query::run_query ──▶ Store ──▶ ConnectionSlot
//!                        │                       │            (gate, limit)      │
//!                        │                       └── envelope::settle ◀──────────┘
//!                        └── JSON-RPC response (CallToolResult / error)
//! ```
//!
//! Every backend keeps a single lazily opened handle behind a lock. Query
//! tools accept read statements only and always carry a row cap.

// Enforce strict safety at compile time
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]
#![warn(rust_2018_idioms)]

pub mod backend;
pub mod envelope;
pub mod mcp;
pub mod query;
pub mod tools;
pub mod types;

// Internal utilities
pub mod observability;

pub use tools::{Backends, Hub};
pub use types::{Config, Error, Result};
