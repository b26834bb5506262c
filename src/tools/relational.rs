//! Relational tool handlers (PostgreSQL and MySQL).

use crate::backend::{CreateOutcome, RelationalStore};
use crate::envelope::Envelope;
use crate::types::Result;
use serde_json::Value;

pub async fn list_databases(store: &RelationalStore) -> Result<Value> {
    let databases = store.list_databases().await?;
    Ok(Envelope::success()
        .rows("database_count", "databases", databases)
        .into_value())
}

pub async fn list_tables(store: &RelationalStore, schema: Option<&str>) -> Result<Value> {
    let schema = schema.unwrap_or(store.default_schema());
    let tables = store.list_tables(Some(schema)).await?;
    Ok(Envelope::success()
        .field("schema", schema)
        .rows("table_count", "tables", tables)
        .into_value())
}

/// Columns of a table. An empty column list means the table does not exist.
pub async fn describe_table(store: &RelationalStore, table: &str, schema: Option<&str>) -> Result<Value> {
    let schema = schema.unwrap_or(store.default_schema());
    let columns = store.describe_table(table, Some(schema)).await?;
    if columns.is_empty() {
        return Ok(Envelope::failure(format!("Table '{table}' not found in schema '{schema}'"))
            .field("table_name", table)
            .field("schema", schema)
            .into_value());
    }
    Ok(Envelope::success()
        .field("table_name", table)
        .field("schema", schema)
        .rows("column_count", "columns", columns)
        .into_value())
}

pub async fn create_database(store: &RelationalStore, name: &str, owner: Option<&str>) -> Result<Value> {
    match store.create_database(name, owner).await? {
        CreateOutcome::Created => {
            let mut envelope = Envelope::success()
                .field("database_name", name)
                .field("message", format!("Database '{name}' created successfully"));
            if let Some(owner) = owner {
                envelope = envelope.field("owner", owner);
            }
            Ok(envelope.into_value())
        }
        CreateOutcome::AlreadyExists => Ok(Envelope::failure(format!("Database '{name}' already exists"))
            .field("database_name", name)
            .into_value()),
    }
}
