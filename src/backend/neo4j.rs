//! Neo4j backend over the HTTP transactional endpoint.
//!
//! Every statement is sent to `POST {uri}/db/{database}/tx/commit` with both
//! the `row` and `graph` result formats. The row carries plain values in
//! column order; the graph part carries labels, relationship types and
//! endpoints, which [`decode_commit`] joins back onto the row through the
//! per-column `meta` entries.

use crate::backend::{
    BackendKind, ConnectionProvider, GraphNode, GraphRecord, GraphRelationship, GraphSession,
    GraphValue, Row,
};
use crate::types::{Error, Neo4jConfig, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Opens Neo4j HTTP sessions from configuration.
#[derive(Debug, Clone)]
pub struct Neo4jConnector {
    client: Client,
    config: Neo4jConfig,
}

impl Neo4jConnector {
    pub fn new(config: &Neo4jConfig, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::connection(format!("Neo4j HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn urls(&self) -> Result<(Url, Url)> {
        let base = Url::parse(&self.config.uri)
            .map_err(|e| Error::connection(format!("invalid NEO4J_URI '{}': {e}", self.config.uri)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::connection(format!(
                "unsupported NEO4J_URI scheme '{}': point it at the HTTP endpoint, e.g. http://neo4j:7474",
                base.scheme()
            )));
        }

        let mut commit = base.clone();
        commit
            .path_segments_mut()
            .map_err(|_| Error::connection(format!("NEO4J_URI '{}' cannot carry a path", self.config.uri)))?
            .pop_if_empty()
            .extend(["db", self.config.database.as_str(), "tx", "commit"]);
        Ok((base, commit))
    }
}

#[async_trait]
impl ConnectionProvider for Neo4jConnector {
    type Handle = Box<dyn GraphSession>;

    fn backend(&self) -> BackendKind {
        BackendKind::Neo4j
    }

    async fn acquire(&self) -> Result<Box<dyn GraphSession>> {
        let (base, commit) = self.urls()?;
        let mut session = Neo4jSession {
            client: self.client.clone(),
            base,
            commit,
            user: self.config.user.clone(),
            password: self.config.password.clone(),
            broken: false,
        };
        session
            .verify()
            .await
            .map_err(|e| Error::connection(format!("Neo4j at {}: {e}", self.config.uri)))?;
        Ok(Box::new(session))
    }

    async fn is_alive(&self, handle: &mut Box<dyn GraphSession>) -> bool {
        handle.is_open()
    }
}

/// One authenticated HTTP session against a Neo4j database.
#[derive(Debug)]
pub struct Neo4jSession {
    client: Client,
    base: Url,
    commit: Url,
    user: String,
    password: Option<String>,
    broken: bool,
}

impl Neo4jSession {
    fn transport_error(&mut self, err: reqwest::Error) -> Error {
        if err.is_connect() || err.is_timeout() || err.is_request() {
            self.broken = true;
        }
        Error::backend(format!("Neo4j request failed: {err}"))
    }
}

#[async_trait]
impl GraphSession for Neo4jSession {
    async fn run(&mut self, cypher: &str, params: Row) -> Result<Vec<GraphRecord>> {
        let body = json!({
            "statements": [{
                "statement": cypher,
                "parameters": params,
                "resultDataContents": ["row", "graph"],
            }]
        });

        let sent = self
            .client
            .post(self.commit.clone())
            .basic_auth(&self.user, self.password.as_ref())
            .json(&body)
            .send()
            .await;
        let response = match sent {
            Ok(response) => response,
            Err(err) => return Err(self.transport_error(err)),
        };

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::backend("Neo4j rejected the configured credentials"));
        }
        let payload: Value = match response.json().await {
            Ok(payload) => payload,
            Err(err) if status.is_success() => return Err(self.transport_error(err)),
            Err(_) => return Err(Error::backend(format!("Neo4j answered HTTP {status}"))),
        };
        decode_commit(payload)
    }

    async fn verify(&mut self) -> Result<()> {
        let sent = self
            .client
            .get(self.base.clone())
            .basic_auth(&self.user, self.password.as_ref())
            .send()
            .await;
        match sent {
            Ok(response) if response.status().is_success() => Ok(()),
            Ok(response) => Err(Error::backend(format!("Neo4j answered HTTP {}", response.status()))),
            Err(err) => Err(self.transport_error(err)),
        }
    }

    fn is_open(&self) -> bool {
        !self.broken
    }
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    errors: Vec<ServerError>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<DataEntry>,
}

#[derive(Debug, Deserialize)]
struct DataEntry {
    #[serde(default)]
    row: Vec<Value>,
    #[serde(default)]
    meta: Vec<Value>,
    #[serde(default)]
    graph: GraphPayload,
}

#[derive(Debug, Default, Deserialize)]
struct GraphPayload {
    #[serde(default)]
    nodes: Vec<WireNode>,
    #[serde(default)]
    relationships: Vec<WireRelationship>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireNode {
    id: Value,
    #[serde(default)]
    element_id: Option<String>,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    properties: Row,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireRelationship {
    id: Value,
    #[serde(default)]
    element_id: Option<String>,
    #[serde(rename = "type")]
    rel_type: String,
    start_node: Value,
    #[serde(default)]
    start_node_element_id: Option<String>,
    end_node: Value,
    #[serde(default)]
    end_node_element_id: Option<String>,
    #[serde(default)]
    properties: Row,
}

#[derive(Debug, Deserialize)]
struct ServerError {
    code: String,
    message: String,
}

/// Decode a `tx/commit` response body into records.
///
/// Server-side errors (syntax, constraint, security) become
/// [`Error::Backend`] carrying the Neo4j status code and message.
pub fn decode_commit(payload: Value) -> Result<Vec<GraphRecord>> {
    let response: CommitResponse = serde_json::from_value(payload)?;
    if let Some(err) = response.errors.first() {
        return Err(Error::backend(format!("{}: {}", err.code, err.message)));
    }

    let Some(result) = response.results.into_iter().next() else {
        return Ok(Vec::new());
    };

    Ok(result
        .data
        .into_iter()
        .map(|entry| decode_entry(&result.columns, entry))
        .collect())
}

fn decode_entry(columns: &[String], entry: DataEntry) -> GraphRecord {
    let DataEntry { row, meta, graph } = entry;
    let fields = columns
        .iter()
        .zip(row)
        .enumerate()
        .map(|(index, (column, value))| {
            let decoded = match meta.get(index) {
                Some(meta) => resolve(meta, value, &graph),
                None => GraphValue::Value(value),
            };
            (column.clone(), decoded)
        })
        .collect();
    GraphRecord { fields }
}

fn resolve(meta: &Value, value: Value, graph: &GraphPayload) -> GraphValue {
    let kind = meta.get("type").and_then(Value::as_str);
    let meta_id = meta.get("id").unwrap_or(&Value::Null);
    let meta_element = meta.get("elementId").and_then(Value::as_str);

    match kind {
        Some("node") => graph
            .nodes
            .iter()
            .find(|node| same_entity(meta_element, meta_id, node.element_id.as_deref(), &node.id))
            .map(|node| GraphValue::Node(to_node(node)))
            .unwrap_or(GraphValue::Value(value)),
        Some("relationship") => graph
            .relationships
            .iter()
            .find(|rel| same_entity(meta_element, meta_id, rel.element_id.as_deref(), &rel.id))
            .map(|rel| GraphValue::Relationship(to_relationship(rel, graph)))
            .unwrap_or(GraphValue::Value(value)),
        _ => GraphValue::Value(value),
    }
}

fn to_node(node: &WireNode) -> GraphNode {
    GraphNode {
        id: node.element_id.clone().unwrap_or_else(|| id_string(&node.id)),
        labels: node.labels.clone(),
        properties: node.properties.clone(),
    }
}

fn to_relationship(rel: &WireRelationship, graph: &GraphPayload) -> GraphRelationship {
    let labels_of = |element: Option<&str>, id: &Value| {
        graph
            .nodes
            .iter()
            .find(|node| same_entity(element, id, node.element_id.as_deref(), &node.id))
            .map(|node| node.labels.clone())
            .unwrap_or_default()
    };

    GraphRelationship {
        id: rel.element_id.clone().unwrap_or_else(|| id_string(&rel.id)),
        rel_type: rel.rel_type.clone(),
        properties: rel.properties.clone(),
        start_labels: labels_of(rel.start_node_element_id.as_deref(), &rel.start_node),
        end_labels: labels_of(rel.end_node_element_id.as_deref(), &rel.end_node),
    }
}

/// Meta ids are numbers while graph ids are strings; element ids win when both sides have one.
fn same_entity(left_element: Option<&str>, left_id: &Value, right_element: Option<&str>, right_id: &Value) -> bool {
    match (left_element, right_element) {
        (Some(left), Some(right)) => left == right,
        _ => id_string(left_id) == id_string(right_id),
    }
}

fn id_string(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn commit_body() -> Value {
        json!({
            "results": [{
                "columns": ["a", "r", "b", "since"],
                "data": [{
                    "row": [{ "name": "Ada" }, { "weight": 2 }, { "name": "Alan" }, 2019],
                    "meta": [
                        { "id": 1, "type": "node", "deleted": false },
                        { "id": 9, "type": "relationship", "deleted": false },
                        { "id": 2, "type": "node", "deleted": false },
                        null
                    ],
                    "graph": {
                        "nodes": [
                            { "id": "1", "labels": ["Person"], "properties": { "name": "Ada" } },
                            { "id": "2", "labels": ["Person", "Engineer"], "properties": { "name": "Alan" } }
                        ],
                        "relationships": [{
                            "id": "9", "type": "KNOWS", "startNode": "1", "endNode": "2",
                            "properties": { "weight": 2 }
                        }]
                    }
                }]
            }],
            "errors": []
        })
    }

    #[test]
    fn joins_graph_metadata_onto_rows() {
        let records = decode_commit(commit_body()).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];

        match record.get("a") {
            Some(GraphValue::Node(node)) => {
                assert_eq!(node.labels, vec!["Person".to_string()]);
                assert_eq!(node.properties["name"], json!("Ada"));
            }
            other => panic!("expected node, got {other:?}"),
        }
        match record.get("r") {
            Some(GraphValue::Relationship(rel)) => {
                assert_eq!(rel.rel_type, "KNOWS");
                assert_eq!(rel.start_labels, vec!["Person".to_string()]);
                assert_eq!(rel.end_labels, vec!["Person".to_string(), "Engineer".to_string()]);
            }
            other => panic!("expected relationship, got {other:?}"),
        }
        assert_eq!(record.get("since"), Some(&GraphValue::Value(json!(2019))));
    }

    #[test]
    fn element_ids_take_precedence() {
        let body = json!({
            "results": [{
                "columns": ["n"],
                "data": [{
                    "row": [{ "title": "Dune" }],
                    "meta": [{ "id": 4, "elementId": "4:abc:4", "type": "node" }],
                    "graph": {
                        "nodes": [
                            { "id": "4", "elementId": "4:other:4", "labels": ["Wrong"], "properties": {} },
                            { "id": "5", "elementId": "4:abc:4", "labels": ["Book"], "properties": { "title": "Dune" } }
                        ],
                        "relationships": []
                    }
                }]
            }],
            "errors": []
        });
        let records = decode_commit(body).unwrap();
        match records[0].get("n") {
            Some(GraphValue::Node(node)) => assert_eq!(node.labels, vec!["Book".to_string()]),
            other => panic!("expected node, got {other:?}"),
        }
    }

    #[test]
    fn scalar_rows_without_graph_stay_plain() {
        let body = json!({
            "results": [{ "columns": ["count(n)"], "data": [{ "row": [42], "meta": [null] }] }],
            "errors": []
        });
        let records = decode_commit(body).unwrap();
        assert_eq!(records[0].fields, vec![("count(n)".to_string(), GraphValue::Value(json!(42)))]);
    }

    #[test]
    fn server_errors_become_backend_errors() {
        let body = json!({
            "results": [],
            "errors": [{ "code": "Neo.ClientError.Statement.SyntaxError", "message": "Invalid input 'MATC'" }]
        });
        let err = decode_commit(body).unwrap_err();
        assert!(matches!(err, Error::Backend(_)));
        assert!(err.to_string().contains("SyntaxError"));
        assert!(!err.is_fatal());
    }

    #[test]
    fn commit_url_targets_configured_database() {
        let config = Neo4jConfig {
            uri: "http://neo4j:7474/".into(),
            database: "movies".into(),
            ..Neo4jConfig::default()
        };
        let connector = Neo4jConnector::new(&config, Duration::from_secs(1)).unwrap();
        let (base, commit) = connector.urls().unwrap();
        assert_eq!(base.as_str(), "http://neo4j:7474/");
        assert_eq!(commit.as_str(), "http://neo4j:7474/db/movies/tx/commit");
    }

    #[test]
    fn bolt_uris_are_refused() {
        let config = Neo4jConfig {
            uri: "bolt://neo4j:7687".into(),
            ..Neo4jConfig::default()
        };
        let connector = Neo4jConnector::new(&config, Duration::from_secs(1)).unwrap();
        assert!(matches!(connector.urls(), Err(Error::Connection(_))));
    }
}
