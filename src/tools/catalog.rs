//! Tool catalog: typed parameter metadata, validation, defaults, JSON Schema.
//!
//! Descriptors are registered once at startup. `tools/list` renders them as
//! MCP tool definitions; `tools/call` validates and defaults arguments against
//! them before dispatch.

use crate::backend::{BackendKind, Row};
use crate::types::{Error, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashMap;

// =============================================================================
// Parameter types
// =============================================================================

/// Parameter type for tool inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    String,
    Int,
    Optional(Box<ParamType>),
}

impl ParamType {
    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    /// Validate a JSON value against this parameter type.
    pub fn validate(&self, value: &Value) -> std::result::Result<(), String> {
        match self {
            ParamType::String if value.is_string() => Ok(()),
            ParamType::String => Err(format!("expected string, got {}", value_type_name(value))),
            ParamType::Int if value.is_i64() || value.is_u64() => Ok(()),
            ParamType::Int => Err(format!("expected integer, got {}", value_type_name(value))),
            ParamType::Optional(_) if value.is_null() => Ok(()),
            ParamType::Optional(inner) => inner.validate(value),
        }
    }

    /// JSON Schema `type` keyword.
    pub fn schema_type(&self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Int => "integer",
            ParamType::Optional(inner) => inner.schema_type(),
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// =============================================================================
// Parameter definition
// =============================================================================

/// A single parameter definition for a tool.
#[derive(Debug, Clone)]
pub struct ParamDef {
    pub name: &'static str,
    pub param_type: ParamType,
    pub description: &'static str,
    pub default: Option<Value>,
}

impl ParamDef {
    pub fn required(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type,
            description,
            default: None,
        }
    }

    pub fn optional(name: &'static str, param_type: ParamType, description: &'static str) -> Self {
        Self {
            name,
            param_type: ParamType::optional(param_type),
            description,
            default: None,
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn is_required(&self) -> bool {
        self.default.is_none() && !matches!(self.param_type, ParamType::Optional(_))
    }

    fn schema(&self) -> Value {
        let mut schema = json!({
            "type": self.param_type.schema_type(),
            "description": self.description,
        });
        if let Some(default) = &self.default {
            schema["default"] = default.clone();
        }
        schema
    }
}

// =============================================================================
// Tool descriptor
// =============================================================================

/// Complete tool metadata entry.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParamDef>,
    /// `None` for service-level tools.
    pub backend: Option<BackendKind>,
}

/// MCP rendering of a descriptor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// JSON Schema object describing the tool's arguments.
    pub fn input_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.to_string(), p.schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.is_required())
            .map(|p| p.name)
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
            "additionalProperties": false,
        })
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.to_string(),
            description: self.description.to_string(),
            input_schema: self.input_schema(),
        }
    }
}

// =============================================================================
// Tool catalog
// =============================================================================

/// Registered tools in registration order.
#[derive(Debug, Default)]
pub struct ToolCatalog {
    entries: Vec<ToolDescriptor>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique and non-empty.
    pub fn register(&mut self, descriptor: ToolDescriptor) -> Result<()> {
        if descriptor.name.is_empty() {
            return Err(Error::validation("Tool name cannot be empty"));
        }
        if self.index.contains_key(descriptor.name) {
            return Err(Error::validation(format!("Tool '{}' registered twice", descriptor.name)));
        }
        self.index.insert(descriptor.name, self.entries.len());
        self.entries.push(descriptor);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.entries[i])
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|d| d.name).collect()
    }

    /// Tools belonging to one backend, in registration order.
    pub fn names_for(&self, backend: BackendKind) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|d| d.backend == Some(backend))
            .map(|d| d.name)
            .collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.entries.iter().map(ToolDescriptor::definition).collect()
    }

    /// Validate arguments against a tool's parameters.
    ///
    /// All problems are reported together in one [`Error::Validation`].
    pub fn validate_params(&self, name: &str, args: &Row) -> Result<()> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {name}")))?;

        let mut errors = Vec::new();
        for param in &descriptor.parameters {
            if param.is_required() && !args.contains_key(param.name) {
                errors.push(format!("Missing required parameter: {}", param.name));
            }
        }
        for (key, value) in args {
            match descriptor.parameters.iter().find(|p| p.name == key) {
                Some(param) => {
                    if let Err(e) = param.param_type.validate(value) {
                        errors.push(format!("Parameter '{key}': {e}"));
                    }
                }
                None => errors.push(format!("Unknown parameter: {key}")),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::validation(errors.join("; ")))
        }
    }

    /// Fill in defaults for parameters the caller omitted (or sent as null).
    pub fn fill_defaults(&self, name: &str, args: &mut Row) -> Result<()> {
        let descriptor = self
            .get(name)
            .ok_or_else(|| Error::not_found(format!("Unknown tool: {name}")))?;

        for param in &descriptor.parameters {
            let Some(default) = &param.default else { continue };
            let missing = args.get(param.name).map_or(true, Value::is_null);
            if missing {
                args.insert(param.name.to_string(), default.clone());
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
