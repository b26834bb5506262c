//! Core types for the hub.
//!
//! - **IDs**: call and session identifiers
//! - **Errors**: application error types with thiserror derives
//! - **Config**: environment-sourced configuration for server and backends

mod config;
mod errors;
mod ids;

pub use config::{
    Config, Neo4jConfig, ObservabilityConfig, QdrantConfig, QueryLimits, ServerConfig, SqlConfig,
    HARD_ROW_CAP,
};
pub use errors::{Error, Result};
pub use ids::{CallId, SessionId};
