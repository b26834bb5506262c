//! Tool names and descriptors for every backend.

use crate::backend::BackendKind;
use crate::tools::catalog::{ParamDef, ParamType, ToolCatalog, ToolDescriptor};
use crate::types::Result;
use serde_json::json;

pub const HEALTH_CHECK: &str = "health_check";
pub const LIST_SERVICES: &str = "list_services";

pub const POSTGRES_QUERY: &str = "postgres_query";
pub const POSTGRES_LIST_DATABASES: &str = "postgres_list_databases";
pub const POSTGRES_LIST_TABLES: &str = "postgres_list_tables";
pub const POSTGRES_DESCRIBE_TABLE: &str = "postgres_describe_table";
pub const POSTGRES_CREATE_DATABASE: &str = "postgres_create_database";

pub const MYSQL_QUERY: &str = "mysql_query";
pub const MYSQL_LIST_DATABASES: &str = "mysql_list_databases";
pub const MYSQL_LIST_TABLES: &str = "mysql_list_tables";
pub const MYSQL_DESCRIBE_TABLE: &str = "mysql_describe_table";
pub const MYSQL_CREATE_DATABASE: &str = "mysql_create_database";

pub const NEO4J_QUERY: &str = "neo4j_query";
pub const NEO4J_LIST_NODES: &str = "neo4j_list_nodes";
pub const NEO4J_LIST_RELATIONSHIPS: &str = "neo4j_list_relationships";

pub const QDRANT_SEARCH: &str = "qdrant_search";
pub const QDRANT_LIST_COLLECTIONS: &str = "qdrant_list_collections";
pub const QDRANT_COLLECTION_INFO: &str = "qdrant_collection_info";

fn limit_param(default_limit: u32) -> ParamDef {
    ParamDef::required("limit", ParamType::Int, "Maximum rows to return (clamped to the server's row cap)")
        .with_default(json!(default_limit))
}

fn descriptor(
    name: &'static str,
    backend: Option<BackendKind>,
    description: &'static str,
    parameters: Vec<ParamDef>,
) -> ToolDescriptor {
    ToolDescriptor {
        name,
        description,
        parameters,
        backend,
    }
}

/// Build the catalog of every tool the hub serves.
pub fn build_catalog(default_limit: u32) -> Result<ToolCatalog> {
    use BackendKind::{MySql, Neo4j, Postgres, Qdrant};

    let limit = || limit_param(default_limit);
    let mut catalog = ToolCatalog::new();

    let tools = vec![
        descriptor(HEALTH_CHECK, None, "Check that the MCP hub is running and report backend and tool health", vec![]),
        descriptor(LIST_SERVICES, None, "List the infrastructure services behind this hub and their tools", vec![]),
        // PostgreSQL
        descriptor(
            POSTGRES_QUERY,
            Some(Postgres),
            "Execute a read-only SQL query (SELECT only) against Supabase Postgres",
            vec![ParamDef::required("query", ParamType::String, "SQL SELECT statement"), limit()],
        ),
        descriptor(POSTGRES_LIST_DATABASES, Some(Postgres), "List databases on the Postgres server", vec![]),
        descriptor(
            POSTGRES_LIST_TABLES,
            Some(Postgres),
            "List tables and views in a Postgres schema",
            vec![ParamDef::required("schema", ParamType::String, "Schema name").with_default(json!("public"))],
        ),
        descriptor(
            POSTGRES_DESCRIBE_TABLE,
            Some(Postgres),
            "Describe the columns of a Postgres table",
            vec![
                ParamDef::required("table_name", ParamType::String, "Table name"),
                ParamDef::required("schema", ParamType::String, "Schema name").with_default(json!("public")),
            ],
        ),
        descriptor(
            POSTGRES_CREATE_DATABASE,
            Some(Postgres),
            "Create a new Postgres database (letters, digits and underscores only)",
            vec![
                ParamDef::required("database_name", ParamType::String, "Name of the database to create"),
                ParamDef::optional("owner", ParamType::String, "Existing role that will own the database"),
            ],
        ),
        // MySQL
        descriptor(
            MYSQL_QUERY,
            Some(MySql),
            "Execute a read-only SQL query (SELECT only) against MySQL",
            vec![ParamDef::required("query", ParamType::String, "SQL SELECT statement"), limit()],
        ),
        descriptor(MYSQL_LIST_DATABASES, Some(MySql), "List databases (schemas) on the MySQL server", vec![]),
        descriptor(
            MYSQL_LIST_TABLES,
            Some(MySql),
            "List tables and views in a MySQL database",
            vec![ParamDef::optional(
                "database",
                ParamType::String,
                "Database name (defaults to the configured database)",
            )],
        ),
        descriptor(
            MYSQL_DESCRIBE_TABLE,
            Some(MySql),
            "Describe the columns of a MySQL table",
            vec![
                ParamDef::required("table_name", ParamType::String, "Table name"),
                ParamDef::optional(
                    "database",
                    ParamType::String,
                    "Database name (defaults to the configured database)",
                ),
            ],
        ),
        descriptor(
            MYSQL_CREATE_DATABASE,
            Some(MySql),
            "Create a new MySQL database (letters, digits and underscores only)",
            vec![ParamDef::required("database_name", ParamType::String, "Name of the database to create")],
        ),
        // Neo4j
        descriptor(
            NEO4J_QUERY,
            Some(Neo4j),
            "Execute a read-only Cypher query (MATCH, RETURN, WITH, UNWIND, CALL) against Neo4j",
            vec![ParamDef::required("query", ParamType::String, "Cypher read query"), limit()],
        ),
        descriptor(
            NEO4J_LIST_NODES,
            Some(Neo4j),
            "List nodes, optionally filtered by label",
            vec![ParamDef::optional("label", ParamType::String, "Node label to filter by"), limit()],
        ),
        descriptor(
            NEO4J_LIST_RELATIONSHIPS,
            Some(Neo4j),
            "List relationships with their endpoints, optionally filtered by type",
            vec![
                ParamDef::optional("relationship_type", ParamType::String, "Relationship type to filter by"),
                limit(),
            ],
        ),
        // Qdrant
        descriptor(
            QDRANT_SEARCH,
            Some(Qdrant),
            "Search a Qdrant collection (returns collection metadata; no embedding is performed)",
            vec![
                ParamDef::required("collection_name", ParamType::String, "Collection to search"),
                ParamDef::required("query", ParamType::String, "Search text"),
                ParamDef::required("limit", ParamType::Int, "Maximum results").with_default(json!(10)),
            ],
        ),
        descriptor(QDRANT_LIST_COLLECTIONS, Some(Qdrant), "List Qdrant collections", vec![]),
        descriptor(
            QDRANT_COLLECTION_INFO,
            Some(Qdrant),
            "Show status, point counts and vector parameters of a Qdrant collection",
            vec![ParamDef::required("collection_name", ParamType::String, "Collection name")],
        ),
    ];

    for tool in tools {
        catalog.register(tool)?;
    }
    Ok(catalog)
}
