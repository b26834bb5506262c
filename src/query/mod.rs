//! Query tools shared by every backend with a query language.
//!
//! [`run_query`] is the whole pipeline: gate check, limit injection,
//! execution through a [`QueryBackend`], envelope. A rejected statement never
//! reaches the backend, so no handle is leased for it.

pub mod gate;
pub mod limit;

pub use gate::{check, Rejection, Verdict};
pub use limit::{apply_limit, clamp_limit, has_limit};

use crate::backend::{BackendKind, Row};
use crate::envelope::Envelope;
use crate::types::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A backend that runs caller-supplied statements.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Run a statement that already passed the gate and carries its limit.
    async fn execute(&self, statement: &str) -> Result<Vec<Row>>;
}

/// Gate, limit and run `query`, returning the result envelope.
///
/// Rejections come back as `Ok` refusal envelopes; backend failures as `Err`
/// for [`crate::envelope::settle`] to map.
pub async fn run_query(
    backend: &dyn QueryBackend,
    query: &str,
    requested_limit: i64,
    hard_cap: u32,
) -> Result<Value> {
    let kind = backend.kind();
    if let Verdict::Reject(rejection) = check(query, kind) {
        tracing::warn!(backend = %kind, reason = rejection.reason, "query rejected by gate");
        return Ok(Envelope::failure(rejection.reason)
            .field("tip", rejection.tip)
            .field("query", query)
            .into_value());
    }

    let limit = clamp_limit(requested_limit, hard_cap);
    let statement = apply_limit(query, i64::from(limit), hard_cap);
    tracing::debug!(backend = %kind, %statement, "executing query");

    let rows = backend.execute(&statement).await?;
    let (count_key, rows_key) = kind.result_keys();
    tracing::info!(backend = %kind, rows = rows.len(), "query completed");

    Ok(Envelope::success()
        .rows(count_key, rows_key, rows)
        .field("query", query)
        .field("limit", limit)
        .into_value())
}
