//! Graph store: listing operations and record normalization.
//!
//! Sessions return [`GraphRecord`]s whose fields keep node and relationship
//! metadata apart from their properties. [`normalize_record`] flattens a record
//! into a JSON map with the metadata in sibling fields:
//!
//! | column kind  | emitted keys                                          |
//! |--------------|-------------------------------------------------------|
//! | node `c`     | `c`, `c_labels`                                       |
//! | relationship | `c`, `c_type`, `c_start_labels`, `c_end_labels`       |
//! | other        | `c`                                                   |

use crate::backend::{with_deadline, BackendKind, ConnectionProvider, ConnectionSlot, Deadlines, Row};
use crate::query::QueryBackend;
use crate::types::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// A node with its labels and properties.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: String,
    pub labels: Vec<String>,
    pub properties: Row,
}

/// A relationship with its type, properties and the labels of its endpoints.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRelationship {
    pub id: String,
    pub rel_type: String,
    pub properties: Row,
    pub start_labels: Vec<String>,
    pub end_labels: Vec<String>,
}

/// One field of a graph record.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphValue {
    Node(GraphNode),
    Relationship(GraphRelationship),
    Value(Value),
}

/// One result record, fields in column order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphRecord {
    pub fields: Vec<(String, GraphValue)>,
}

impl GraphRecord {
    pub fn get(&self, column: &str) -> Option<&GraphValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// A live graph session.
#[async_trait]
pub trait GraphSession: Send {
    /// Run a Cypher statement with named parameters.
    async fn run(&mut self, cypher: &str, params: Row) -> Result<Vec<GraphRecord>>;

    /// Round-trip to the server.
    async fn verify(&mut self) -> Result<()>;

    /// False once a transport failure has been seen.
    fn is_open(&self) -> bool;
}

/// Flatten a record into a JSON map with sibling metadata fields.
pub fn normalize_record(record: &GraphRecord) -> Row {
    let mut row = Row::new();
    for (column, value) in &record.fields {
        match value {
            GraphValue::Node(node) => {
                row.insert(column.clone(), Value::Object(node.properties.clone()));
                row.insert(format!("{column}_labels"), json!(node.labels));
            }
            GraphValue::Relationship(rel) => {
                row.insert(column.clone(), Value::Object(rel.properties.clone()));
                row.insert(format!("{column}_type"), json!(rel.rel_type));
                row.insert(format!("{column}_start_labels"), json!(rel.start_labels));
                row.insert(format!("{column}_end_labels"), json!(rel.end_labels));
            }
            GraphValue::Value(plain) => {
                row.insert(column.clone(), plain.clone());
            }
        }
    }
    row
}

const LIST_NODES: &str = "MATCH (n) WHERE $label IS NULL OR $label IN labels(n) RETURN n";
const LIST_RELATIONSHIPS: &str =
    "MATCH (a)-[r]->(b) WHERE $relationship_type IS NULL OR type(r) = $relationship_type RETURN a, r, b";

/// The graph backend: handle slot + deadlines.
pub struct GraphStore {
    slot: ConnectionSlot<Box<dyn GraphSession>>,
    deadlines: Deadlines,
}

impl GraphStore {
    pub fn new(
        provider: Arc<dyn ConnectionProvider<Handle = Box<dyn GraphSession>>>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            slot: ConnectionSlot::new(provider, deadlines.connect),
            deadlines,
        }
    }

    pub fn slot(&self) -> &ConnectionSlot<Box<dyn GraphSession>> {
        &self.slot
    }

    /// Nodes, optionally restricted to one label. `limit` must already be clamped.
    pub async fn list_nodes(&self, label: Option<&str>, limit: u32) -> Result<Vec<Row>> {
        let mut params = Row::new();
        params.insert("label".into(), json!(label));
        let records = self.run(&format!("{LIST_NODES} LIMIT {limit}"), params).await?;

        Ok(records
            .iter()
            .filter_map(|record| match record.get("n") {
                Some(GraphValue::Node(node)) => {
                    let mut item = Row::new();
                    item.insert("node".into(), Value::Object(node.properties.clone()));
                    item.insert("_labels".into(), json!(node.labels));
                    Some(item)
                }
                _ => None,
            })
            .collect())
    }

    /// Relationships with both endpoints, optionally restricted to one type.
    pub async fn list_relationships(&self, rel_type: Option<&str>, limit: u32) -> Result<Vec<Row>> {
        let mut params = Row::new();
        params.insert("relationship_type".into(), json!(rel_type));
        let records = self
            .run(&format!("{LIST_RELATIONSHIPS} LIMIT {limit}"), params)
            .await?;

        Ok(records.iter().filter_map(relationship_item).collect())
    }

    async fn run(&self, cypher: &str, params: Row) -> Result<Vec<GraphRecord>> {
        let mut session = self.slot.lease().await?;
        with_deadline(self.deadlines.query, "cypher", session.run(cypher, params)).await
    }
}

fn relationship_item(record: &GraphRecord) -> Option<Row> {
    let (Some(GraphValue::Node(start)), Some(GraphValue::Relationship(rel)), Some(GraphValue::Node(end))) =
        (record.get("a"), record.get("r"), record.get("b"))
    else {
        return None;
    };

    let mut item = Row::new();
    item.insert("start".into(), Value::Object(start.properties.clone()));
    item.insert("relationship".into(), Value::Object(rel.properties.clone()));
    item.insert("end".into(), Value::Object(end.properties.clone()));
    item.insert("relationship_type".into(), json!(rel.rel_type));
    item.insert("start_labels".into(), json!(start.labels));
    item.insert("end_labels".into(), json!(end.labels));
    Some(item)
}

#[async_trait]
impl QueryBackend for GraphStore {
    fn kind(&self) -> BackendKind {
        BackendKind::Neo4j
    }

    async fn execute(&self, statement: &str) -> Result<Vec<Row>> {
        let records = self.run(statement, Row::new()).await?;
        Ok(records.iter().map(normalize_record).collect())
    }
}

impl fmt::Debug for GraphStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphStore")
            .field("slot", &self.slot)
            .field("deadlines", &self.deadlines)
            .finish()
    }
}
