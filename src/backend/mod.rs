//! Backend integrations.
//!
//! Each backend owns one [`ConnectionSlot`] holding a lazily created handle.
//! Handles sit behind a capability trait ([`SqlSession`], [`GraphSession`],
//! [`VectorSession`]) so the stores above them can be driven by fakes.
//!
//! ```text
//!   tool call ──▶ Store ──lease()──▶ ConnectionSlot ──acquire()/is_alive()──▶ Provider
//!                   │                     │
//!                   └── deadline(call) ───┴──▶ Session (sqlx / reqwest)
//! ```

pub mod graph;
pub mod mysql;
pub mod neo4j;
pub mod postgres;
pub mod qdrant;
pub mod relational;
pub mod slot;
pub mod vector;

pub use graph::{GraphNode, GraphRecord, GraphRelationship, GraphSession, GraphStore, GraphValue};
pub use relational::{CreateOutcome, RelationalStore, SqlDialect, SqlSession};
pub use slot::{ConnectionProvider, ConnectionSlot, Lease};
pub use vector::{VectorSession, VectorStore};

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// A normalized row, record or metadata entry.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// The four integrated backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Postgres,
    MySql,
    Neo4j,
    Qdrant,
}

/// Statement language accepted by a backend's query tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryLanguage {
    Sql,
    Cypher,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Postgres,
        BackendKind::MySql,
        BackendKind::Neo4j,
        BackendKind::Qdrant,
    ];

    /// Stable key, also the prefix of the backend's tool names.
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Postgres => "postgres",
            BackendKind::MySql => "mysql",
            BackendKind::Neo4j => "neo4j",
            BackendKind::Qdrant => "qdrant",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            BackendKind::Postgres => "Supabase Postgres",
            BackendKind::MySql => "MySQL",
            BackendKind::Neo4j => "Neo4j Graph Database",
            BackendKind::Qdrant => "Qdrant Vector Database",
        }
    }

    /// `None` for backends without a textual query language.
    pub fn query_language(self) -> Option<QueryLanguage> {
        match self {
            BackendKind::Postgres | BackendKind::MySql => Some(QueryLanguage::Sql),
            BackendKind::Neo4j => Some(QueryLanguage::Cypher),
            BackendKind::Qdrant => None,
        }
    }

    /// Envelope keys for a query result: (count key, rows key).
    pub fn result_keys(self) -> (&'static str, &'static str) {
        match self {
            BackendKind::Neo4j => ("record_count", "records"),
            _ => ("row_count", "rows"),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deadlines applied around backend calls.
#[derive(Debug, Clone, Copy)]
pub struct Deadlines {
    /// Opening or probing a handle.
    pub connect: Duration,
    /// A single statement or request.
    pub query: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            query: Duration::from_secs(30),
        }
    }
}

impl From<&crate::types::QueryLimits> for Deadlines {
    fn from(limits: &crate::types::QueryLimits) -> Self {
        Self {
            connect: limits.connect_timeout,
            query: limits.query_timeout,
        }
    }
}

/// Run one backend call under a deadline.
pub async fn with_deadline<T, F>(limit: Duration, what: &str, call: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(operation = what, timeout_ms = limit.as_millis() as u64, "backend call timed out");
            Err(Error::timeout(format!(
                "{what} did not complete within {}",
                humantime_serde::re::humantime::format_duration(limit)
            )))
        }
    }
}

/// Whether `name` is a safe identifier for interpolation into DDL.
///
/// Letters, digits and underscore only, at most `max_len` bytes.
pub fn is_safe_identifier(name: &str, max_len: usize) -> bool {
    !name.is_empty()
        && name.len() <= max_len
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
