//! Result envelopes.
//!
//! Every tool answers with a JSON object carrying `success: bool`. Successful
//! calls add their payload fields; failed calls add `error` (and sometimes
//! `tip`) plus an echo of the arguments they were called with. [`settle`] is
//! the single place where a tool's `Result` becomes that object.

use crate::backend::Row;
use crate::types::{Error, Result};
use serde::Serialize;
use serde_json::Value;

/// Builder for a tool result object.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    body: Row,
}

impl Envelope {
    pub fn success() -> Self {
        let mut body = Row::new();
        body.insert("success".into(), Value::Bool(true));
        Self { body }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let mut body = Row::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(error.into()));
        Self { body }
    }

    /// Set a field. Values that cannot be serialized become `null`.
    pub fn field(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.body.insert(key.to_string(), value);
        self
    }

    /// Set a count field and the list it counts.
    pub fn rows(mut self, count_key: &str, rows_key: &str, rows: Vec<Row>) -> Self {
        self.body.insert(count_key.to_string(), Value::from(rows.len()));
        self.body.insert(
            rows_key.to_string(),
            Value::Array(rows.into_iter().map(Value::Object).collect()),
        );
        self
    }

    /// Copy call arguments into the envelope without overwriting existing keys.
    pub fn echo(mut self, args: &Row) -> Self {
        for (key, value) in args {
            self.body.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.body)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        envelope.into_value()
    }
}

/// Whether a result object reports success.
pub fn is_success(result: &Value) -> bool {
    result.get("success").and_then(Value::as_bool).unwrap_or(true)
}

/// Map a tool's outcome onto its envelope.
///
/// Non-fatal errors become failure envelopes echoing `args`. Fatal errors
/// ([`Error::is_fatal`]) are returned unchanged for the protocol layer.
pub fn settle(tool: &str, args: &Row, result: Result<Value>) -> Result<Value> {
    match result {
        Ok(value) => Ok(value),
        Err(err) if err.is_fatal() => {
            tracing::error!(tool, error = %err, "tool failed with fatal error");
            Err(err)
        }
        Err(err) => {
            tracing::warn!(tool, kind = err.kind(), error = %err, "tool call failed");
            Ok(Envelope::failure(failure_message(&err))
                .field("error_kind", err.kind())
                .echo(args)
                .into_value())
        }
    }
}

/// Backend and validation messages go out verbatim; the variant prefix is kept for the rest.
fn failure_message(err: &Error) -> String {
    match err {
        Error::Validation(msg) | Error::Backend(msg) => msg.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn args(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn builder_shapes_success_payloads() {
        let mut row = Row::new();
        row.insert("id".into(), json!(1));
        let value = Envelope::success()
            .rows("row_count", "rows", vec![row])
            .field("limit", 10)
            .into_value();
        assert_eq!(
            value,
            json!({ "success": true, "row_count": 1, "rows": [{ "id": 1 }], "limit": 10 })
        );
        assert!(is_success(&value));
    }

    #[test]
    fn echo_never_overwrites() {
        let value = Envelope::failure("boom")
            .echo(&args(json!({ "error": "from caller", "query": "SELECT 1" })))
            .into_value();
        assert_eq!(value["error"], json!("boom"));
        assert_eq!(value["query"], json!("SELECT 1"));
        assert!(!is_success(&value));
    }

    #[test]
    fn non_fatal_errors_are_enveloped_with_arguments() {
        let call_args = args(json!({ "table_name": "ghosts" }));
        let value = settle(
            "postgres_describe_table",
            &call_args,
            Err(Error::backend("relation \"ghosts\" does not exist")),
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "success": false,
                "error": "relation \"ghosts\" does not exist",
                "error_kind": "backend",
                "table_name": "ghosts",
            })
        );
    }

    #[test]
    fn timeouts_keep_their_prefix() {
        let value = settle("neo4j_query", &Row::new(), Err(Error::timeout("cypher took too long"))).unwrap();
        assert_eq!(value["error"], json!("timeout: cypher took too long"));
        assert_eq!(value["error_kind"], json!("timeout"));
    }

    #[test]
    fn fatal_errors_propagate() {
        let err = settle("mysql_query", &Row::new(), Err(Error::connection("refused"))).unwrap_err();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn successes_pass_through() {
        let value = settle("health_check", &Row::new(), Ok(json!({ "status": "healthy" }))).unwrap();
        assert_eq!(value, json!({ "status": "healthy" }));
    }
}
