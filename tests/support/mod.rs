//! In-memory backends for integration tests.
//!
//! Each fake records what it was asked to do so tests can assert on handles
//! opened, statements issued and autocommit transitions.

#![allow(dead_code)]

use async_trait::async_trait;
use mcp_hub::backend::{
    BackendKind, ConnectionProvider, Deadlines, GraphNode, GraphRecord, GraphSession, GraphStore, GraphValue,
    RelationalStore, Row, SqlDialect, SqlSession, VectorSession, VectorStore,
};
use mcp_hub::{Backends, Config, Error, Hub, Result};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        other => panic!("expected a JSON object, got {other}"),
    }
}

// =============================================================================
// SQL
// =============================================================================

#[derive(Debug, Default)]
pub struct SqlState {
    pub opened: AtomicUsize,
    pub refuse_connections: AtomicBool,
    pub fail_create: AtomicBool,
    pub stall_create: AtomicBool,
    pub statements: Mutex<Vec<String>>,
    pub databases: Mutex<Vec<String>>,
    pub roles: Mutex<Vec<String>>,
    /// Session autocommit flag observed by each `execute`.
    pub autocommit_at_execute: Mutex<Vec<bool>>,
    /// Autocommit flag of the live session after its last change.
    pub autocommit_now: AtomicBool,
}

impl SqlState {
    pub fn with_databases(names: &[&str]) -> Arc<Self> {
        let state = Self::default();
        *state.databases.lock().unwrap() = names.iter().map(|n| n.to_string()).collect();
        *state.roles.lock().unwrap() = vec!["postgres".to_string()];
        Arc::new(state)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn statements(&self) -> Vec<String> {
        self.statements.lock().unwrap().clone()
    }

    pub fn issued_create(&self) -> bool {
        self.statements().iter().any(|s| s.starts_with("CREATE DATABASE"))
    }
}

#[derive(Debug)]
pub struct FakeSqlProvider {
    pub backend: BackendKind,
    pub state: Arc<SqlState>,
}

#[async_trait]
impl ConnectionProvider for FakeSqlProvider {
    type Handle = Box<dyn SqlSession>;

    fn backend(&self) -> BackendKind {
        self.backend
    }

    async fn acquire(&self) -> Result<Box<dyn SqlSession>> {
        if self.state.refuse_connections.load(Ordering::SeqCst) {
            return Err(Error::connection(format!("{} refused the connection", self.backend)));
        }
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        self.state.autocommit_now.store(false, Ordering::SeqCst);
        Ok(Box::new(FakeSqlSession {
            state: self.state.clone(),
            autocommit: false,
        }))
    }

    async fn is_alive(&self, _handle: &mut Box<dyn SqlSession>) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct FakeSqlSession {
    state: Arc<SqlState>,
    autocommit: bool,
}

fn users() -> Vec<Row> {
    ["ada", "grace", "linus"]
        .iter()
        .enumerate()
        .map(|(i, name)| object(json!({ "id": i + 1, "name": name })))
        .collect()
}

#[async_trait]
impl SqlSession for FakeSqlSession {
    async fn fetch(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        self.state.statements.lock().unwrap().push(sql.to_string());
        let lowered = sql.to_lowercase();

        if lowered.contains("where datname = ") || lowered.contains("where schema_name = ") {
            let exists = self.state.databases.lock().unwrap().iter().any(|d| d == params[0]);
            return Ok(if exists { vec![object(json!({ "found": 1 }))] } else { vec![] });
        }
        if lowered.contains("pg_roles") {
            let exists = self.state.roles.lock().unwrap().iter().any(|r| r == params[0]);
            return Ok(if exists { vec![object(json!({ "found": 1 }))] } else { vec![] });
        }
        if lowered.contains("pg_database") || lowered.contains("information_schema.schemata") {
            let names = self.state.databases.lock().unwrap().clone();
            return Ok(names.into_iter().map(|n| object(json!({ "name": n }))).collect());
        }
        if lowered.contains("information_schema.tables") {
            return Ok(vec![object(json!({ "table_name": "users", "table_type": "BASE TABLE" }))]);
        }
        if lowered.contains("information_schema.columns") {
            if params.get(1) != Some(&"users") {
                return Ok(vec![]);
            }
            return Ok(vec![
                object(json!({ "column_name": "id", "data_type": "integer", "is_nullable": "NO" })),
                object(json!({ "column_name": "name", "data_type": "text", "is_nullable": "YES" })),
            ]);
        }
        Ok(users())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        self.state.statements.lock().unwrap().push(sql.to_string());
        self.state.autocommit_at_execute.lock().unwrap().push(self.autocommit);
        if self.state.stall_create.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        if self.state.fail_create.load(Ordering::SeqCst) {
            return Err(Error::backend("permission denied to create database"));
        }
        if let Some(name) = sql.split_whitespace().nth(2) {
            let name = name.trim_matches(|c| c == '"' || c == '`');
            self.state.databases.lock().unwrap().push(name.to_string());
        }
        Ok(0)
    }

    async fn ping(&mut self) -> Result<()> {
        Ok(())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn set_autocommit(&mut self, enabled: bool) {
        self.autocommit = enabled;
        self.state.autocommit_now.store(enabled, Ordering::SeqCst);
    }
}

// =============================================================================
// Graph
// =============================================================================

#[derive(Debug, Default)]
pub struct GraphState {
    pub opened: AtomicUsize,
    pub runs: Mutex<Vec<(String, Row)>>,
    pub records: Mutex<Vec<GraphRecord>>,
}

impl GraphState {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn runs(&self) -> Vec<(String, Row)> {
        self.runs.lock().unwrap().clone()
    }
}

pub fn person(name: &str) -> GraphValue {
    GraphValue::Node(GraphNode {
        id: name.to_string(),
        labels: vec!["Person".to_string()],
        properties: object(json!({ "name": name })),
    })
}

#[derive(Debug)]
pub struct FakeGraphProvider {
    pub state: Arc<GraphState>,
}

#[async_trait]
impl ConnectionProvider for FakeGraphProvider {
    type Handle = Box<dyn GraphSession>;

    fn backend(&self) -> BackendKind {
        BackendKind::Neo4j
    }

    async fn acquire(&self) -> Result<Box<dyn GraphSession>> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeGraphSession {
            state: self.state.clone(),
        }))
    }

    async fn is_alive(&self, handle: &mut Box<dyn GraphSession>) -> bool {
        handle.is_open()
    }
}

#[derive(Debug)]
pub struct FakeGraphSession {
    state: Arc<GraphState>,
}

#[async_trait]
impl GraphSession for FakeGraphSession {
    async fn run(&mut self, cypher: &str, params: Row) -> Result<Vec<GraphRecord>> {
        self.state.runs.lock().unwrap().push((cypher.to_string(), params));
        Ok(self.state.records.lock().unwrap().clone())
    }

    async fn verify(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }
}

// =============================================================================
// Vector
// =============================================================================

#[derive(Debug, Default)]
pub struct VectorState {
    pub opened: AtomicUsize,
    pub collections: Mutex<Vec<(String, Value)>>,
}

#[derive(Debug)]
pub struct FakeVectorProvider {
    pub state: Arc<VectorState>,
}

#[async_trait]
impl ConnectionProvider for FakeVectorProvider {
    type Handle = Box<dyn VectorSession>;

    fn backend(&self) -> BackendKind {
        BackendKind::Qdrant
    }

    async fn acquire(&self) -> Result<Box<dyn VectorSession>> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeVectorSession {
            state: self.state.clone(),
        }))
    }

    async fn is_alive(&self, _handle: &mut Box<dyn VectorSession>) -> bool {
        true
    }
}

#[derive(Debug)]
pub struct FakeVectorSession {
    state: Arc<VectorState>,
}

#[async_trait]
impl VectorSession for FakeVectorSession {
    async fn list_collections(&mut self) -> Result<Vec<String>> {
        Ok(self.state.collections.lock().unwrap().iter().map(|(n, _)| n.clone()).collect())
    }

    async fn collection_info(&mut self, name: &str) -> Result<Value> {
        self.state
            .collections
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, info)| info.clone())
            .ok_or_else(|| Error::backend(format!("Not found: Collection `{name}` doesn't exist!")))
    }

    fn is_open(&self) -> bool {
        true
    }
}

// =============================================================================
// Fixture
// =============================================================================

/// A hub wired to fakes, plus handles on the fakes' state.
pub struct Fixture {
    pub hub: Arc<Hub>,
    pub postgres: Arc<SqlState>,
    pub mysql: Arc<SqlState>,
    pub graph: Arc<GraphState>,
    pub vector: Arc<VectorState>,
}

pub fn deadlines() -> Deadlines {
    Deadlines {
        connect: Duration::from_millis(500),
        query: Duration::from_millis(300),
    }
}

pub fn postgres_store(state: &Arc<SqlState>) -> RelationalStore {
    RelationalStore::new(
        SqlDialect::Postgres,
        Arc::new(FakeSqlProvider {
            backend: BackendKind::Postgres,
            state: state.clone(),
        }),
        deadlines(),
        "public",
    )
}

pub fn mysql_store(state: &Arc<SqlState>) -> RelationalStore {
    RelationalStore::new(
        SqlDialect::MySql,
        Arc::new(FakeSqlProvider {
            backend: BackendKind::MySql,
            state: state.clone(),
        }),
        deadlines(),
        "shop",
    )
}

impl Fixture {
    pub fn new() -> Self {
        let postgres = SqlState::with_databases(&["postgres", "already_existing_name"]);
        let mysql = SqlState::with_databases(&["mysql", "shop"]);
        let graph = Arc::new(GraphState::default());
        let vector = Arc::new(VectorState::default());
        vector.collections.lock().unwrap().push((
            "docs".to_string(),
            json!({
                "status": "green",
                "points_count": 42,
                "config": { "params": { "vectors": { "size": 384, "distance": "Cosine" } } }
            }),
        ));

        let backends = Backends {
            postgres: postgres_store(&postgres),
            mysql: mysql_store(&mysql),
            neo4j: GraphStore::new(Arc::new(FakeGraphProvider { state: graph.clone() }), deadlines()),
            qdrant: VectorStore::new(Arc::new(FakeVectorProvider { state: vector.clone() }), deadlines()),
        };
        let hub = Hub::new(backends, &Config::default()).unwrap();

        Self {
            hub: Arc::new(hub),
            postgres,
            mysql,
            graph,
            vector,
        }
    }

    pub async fn call(&self, tool: &str, args: Value) -> Value {
        self.hub.call(tool, object(args)).await.unwrap()
    }
}
