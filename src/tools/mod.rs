//! Tool layer: catalog, handlers, health tracking and the dispatching [`Hub`].

pub mod catalog;
pub mod definitions;
pub mod graph;
pub mod health;
pub mod hub;
pub mod relational;
pub mod service;
pub mod vector;

pub use catalog::{ParamDef, ParamType, ToolCatalog, ToolDefinition, ToolDescriptor};
pub use health::{HealthConfig, HealthStatus, ToolHealthTracker};
pub use hub::{Backends, Hub};

use crate::backend::Row;
use crate::types::{Error, Result};
use serde_json::Value;

/// Required string argument.
pub(crate) fn str_arg<'a>(args: &'a Row, name: &str) -> Result<&'a str> {
    opt_str_arg(args, name)?.ok_or_else(|| Error::validation(format!("Missing required parameter: {name}")))
}

/// Optional string argument; `null` counts as absent.
pub(crate) fn opt_str_arg<'a>(args: &'a Row, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(Error::validation(format!("Parameter '{name}': expected string"))),
    }
}

/// Integer argument with a fallback for absent values.
pub(crate) fn int_arg(args: &Row, name: &str, fallback: i64) -> Result<i64> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(fallback),
        Some(value) => value
            .as_i64()
            .or_else(|| value.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
            .ok_or_else(|| Error::validation(format!("Parameter '{name}': expected integer"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => Row::new(),
        }
    }

    #[test]
    fn string_arguments() {
        let call = args(json!({ "query": "SELECT 1", "schema": null, "limit": 3 }));
        assert_eq!(str_arg(&call, "query").unwrap(), "SELECT 1");
        assert_eq!(opt_str_arg(&call, "schema").unwrap(), None);
        assert!(str_arg(&call, "schema").is_err());
        assert!(opt_str_arg(&call, "limit").is_err());
    }

    #[test]
    fn integer_arguments() {
        let call = args(json!({ "limit": 3, "huge": u64::MAX, "text": "3" }));
        assert_eq!(int_arg(&call, "limit", 100).unwrap(), 3);
        assert_eq!(int_arg(&call, "missing", 100).unwrap(), 100);
        assert_eq!(int_arg(&call, "huge", 100).unwrap(), i64::MAX);
        assert!(int_arg(&call, "text", 100).is_err());
    }
}
