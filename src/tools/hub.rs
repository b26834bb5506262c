//! The hub: owns the backends and the catalog, dispatches tool calls.

use crate::backend::mysql::MySqlConnector;
use crate::backend::neo4j::Neo4jConnector;
use crate::backend::postgres::PgConnector;
use crate::backend::qdrant::QdrantConnector;
use crate::backend::{BackendKind, Deadlines, GraphStore, RelationalStore, Row, SqlDialect, VectorStore};
use crate::envelope::{is_success, settle};
use crate::query::{clamp_limit, run_query};
use crate::tools::definitions::*;
use crate::tools::health::{SystemHealthReport, ToolHealthTracker};
use crate::tools::{graph, int_arg, opt_str_arg, relational, service, str_arg, vector, ToolCatalog};
use crate::types::{CallId, Config, Error, QueryLimits, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tracing::Instrument;

/// Stores for the four backends.
#[derive(Debug)]
pub struct Backends {
    pub postgres: RelationalStore,
    pub mysql: RelationalStore,
    pub neo4j: GraphStore,
    pub qdrant: VectorStore,
}

impl Backends {
    /// Stores wired to the real drivers. Nothing connects until the first call.
    pub fn from_config(config: &Config) -> Result<Self> {
        let deadlines = Deadlines::from(&config.limits);
        Ok(Self {
            postgres: RelationalStore::new(
                SqlDialect::Postgres,
                Arc::new(PgConnector::new(&config.postgres)),
                deadlines,
                "public",
            ),
            mysql: RelationalStore::new(
                SqlDialect::MySql,
                Arc::new(MySqlConnector::new(&config.mysql)),
                deadlines,
                config.mysql.database.clone(),
            ),
            neo4j: GraphStore::new(Arc::new(Neo4jConnector::new(&config.neo4j, deadlines.connect)?), deadlines),
            qdrant: VectorStore::new(Arc::new(QdrantConnector::new(&config.qdrant, deadlines.connect)?), deadlines),
        })
    }

    /// Whether the backend holds a handle, and how many it has opened.
    pub fn connection_state(&self, kind: BackendKind) -> (bool, u64) {
        match kind {
            BackendKind::Postgres => (self.postgres.slot().is_connected(), self.postgres.slot().connections_opened()),
            BackendKind::MySql => (self.mysql.slot().is_connected(), self.mysql.slot().connections_opened()),
            BackendKind::Neo4j => (self.neo4j.slot().is_connected(), self.neo4j.slot().connections_opened()),
            BackendKind::Qdrant => (self.qdrant.slot().is_connected(), self.qdrant.slot().connections_opened()),
        }
    }
}

/// Catalog + backends + per-tool health.
#[derive(Debug)]
pub struct Hub {
    catalog: ToolCatalog,
    backends: Backends,
    limits: QueryLimits,
    endpoints: Vec<(BackendKind, String)>,
    health: Mutex<ToolHealthTracker>,
    started: Instant,
}

impl Hub {
    pub fn new(backends: Backends, config: &Config) -> Result<Self> {
        let catalog = build_catalog(config.limits.default_limit)?;
        let mut health = ToolHealthTracker::default();
        health.set_registered_tools(catalog.names().into_iter().map(String::from).collect());

        let endpoints = vec![
            (BackendKind::Postgres, config.postgres.endpoint()),
            (BackendKind::MySql, config.mysql.endpoint()),
            (BackendKind::Neo4j, config.neo4j.uri.clone()),
            (BackendKind::Qdrant, config.qdrant.url.clone()),
        ];

        Ok(Self {
            catalog,
            backends,
            limits: config.limits.clone(),
            endpoints,
            health: Mutex::new(health),
            started: Instant::now(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(Backends::from_config(config)?, config)
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    pub(crate) fn endpoints(&self) -> &[(BackendKind, String)] {
        &self.endpoints
    }

    pub(crate) fn uptime_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn health_report(&self) -> SystemHealthReport {
        self.health
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .check_system()
    }

    /// Invoke a tool by name.
    ///
    /// Unknown tools and fatal backend errors are `Err`; everything else,
    /// including argument problems, comes back as an envelope.
    pub async fn call(&self, name: &str, args: Row) -> Result<Value> {
        if !self.catalog.has_tool(name) {
            return Err(Error::not_found(format!("Unknown tool: {name}")));
        }

        let call_id = CallId::new();
        let span = tracing::info_span!("tool_call", tool = name, call_id = %call_id);

        async move {
            let started = Instant::now();
            let mut args = args;
            let outcome = match self.prepare(name, &mut args) {
                Ok(()) => self.dispatch(name, &args).await,
                Err(err) => Err(err),
            };

            let (success, error_kind) = match &outcome {
                Ok(value) => (is_success(value), None),
                Err(err) => (false, Some(err.kind())),
            };
            let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
            self.health
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .record(name, success, latency_ms, error_kind);
            tracing::debug!(success, latency_ms, "tool call finished");

            settle(name, &args, outcome)
        }
        .instrument(span)
        .await
    }

    fn prepare(&self, name: &str, args: &mut Row) -> Result<()> {
        self.catalog.fill_defaults(name, args)?;
        self.catalog.validate_params(name, args)
    }

    async fn dispatch(&self, name: &str, args: &Row) -> Result<Value> {
        let b = &self.backends;
        let cap = self.limits.hard_cap;
        let default_limit = i64::from(self.limits.default_limit);
        let limit = || int_arg(args, "limit", default_limit);

        match name {
            HEALTH_CHECK => Ok(service::health_check(self)),
            LIST_SERVICES => Ok(service::list_services(self)),

            POSTGRES_QUERY => run_query(&b.postgres, str_arg(args, "query")?, limit()?, cap).await,
            POSTGRES_LIST_DATABASES => relational::list_databases(&b.postgres).await,
            POSTGRES_LIST_TABLES => relational::list_tables(&b.postgres, opt_str_arg(args, "schema")?).await,
            POSTGRES_DESCRIBE_TABLE => {
                relational::describe_table(&b.postgres, str_arg(args, "table_name")?, opt_str_arg(args, "schema")?)
                    .await
            }
            POSTGRES_CREATE_DATABASE => {
                relational::create_database(&b.postgres, str_arg(args, "database_name")?, opt_str_arg(args, "owner")?)
                    .await
            }

            MYSQL_QUERY => run_query(&b.mysql, str_arg(args, "query")?, limit()?, cap).await,
            MYSQL_LIST_DATABASES => relational::list_databases(&b.mysql).await,
            MYSQL_LIST_TABLES => relational::list_tables(&b.mysql, opt_str_arg(args, "database")?).await,
            MYSQL_DESCRIBE_TABLE => {
                relational::describe_table(&b.mysql, str_arg(args, "table_name")?, opt_str_arg(args, "database")?)
                    .await
            }
            MYSQL_CREATE_DATABASE => relational::create_database(&b.mysql, str_arg(args, "database_name")?, None).await,

            NEO4J_QUERY => run_query(&b.neo4j, str_arg(args, "query")?, limit()?, cap).await,
            NEO4J_LIST_NODES => graph::list_nodes(&b.neo4j, opt_str_arg(args, "label")?, clamp_limit(limit()?, cap)).await,
            NEO4J_LIST_RELATIONSHIPS => {
                graph::list_relationships(
                    &b.neo4j,
                    opt_str_arg(args, "relationship_type")?,
                    clamp_limit(limit()?, cap),
                )
                .await
            }

            QDRANT_SEARCH => {
                vector::search(
                    &b.qdrant,
                    str_arg(args, "collection_name")?,
                    str_arg(args, "query")?,
                    clamp_limit(int_arg(args, "limit", 10)?, cap),
                )
                .await
            }
            QDRANT_LIST_COLLECTIONS => vector::list_collections(&b.qdrant).await,
            QDRANT_COLLECTION_INFO => vector::collection_info(&b.qdrant, str_arg(args, "collection_name")?).await,

            other => Err(Error::not_found(format!("Unknown tool: {other}"))),
        }
    }
}
