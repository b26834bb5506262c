//! Relational stores: shared logic for the PostgreSQL and MySQL backends.
//!
//! The dialect supplies catalog statements and identifier quoting; the store
//! owns the handle slot and runs every call under the query deadline.

use crate::backend::{
    is_safe_identifier, with_deadline, BackendKind, ConnectionProvider, ConnectionSlot, Deadlines,
    Lease, Row,
};
use crate::query::QueryBackend;
use crate::types::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// A live SQL session.
///
/// In manual-commit mode (`autocommit() == false`) each call runs inside its
/// own transaction. Reads roll it back; `execute` commits it.
#[async_trait]
pub trait SqlSession: Send {
    /// Run a row-returning statement with string bind parameters.
    async fn fetch(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>>;

    /// Run a statement through the simple protocol (DDL). Returns affected rows.
    async fn execute(&mut self, sql: &str) -> Result<u64>;

    async fn ping(&mut self) -> Result<()>;

    fn autocommit(&self) -> bool;

    fn set_autocommit(&mut self, enabled: bool);
}

/// Outcome of a `create_database` call that reached the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Catalog statements and identifier rules per SQL flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    MySql,
}

impl SqlDialect {
    pub fn backend(self) -> BackendKind {
        match self {
            SqlDialect::Postgres => BackendKind::Postgres,
            SqlDialect::MySql => BackendKind::MySql,
        }
    }

    /// Longest identifier the server accepts.
    pub fn max_identifier_len(self) -> usize {
        match self {
            SqlDialect::Postgres => 63,
            SqlDialect::MySql => 64,
        }
    }

    /// Quote an identifier that already passed [`is_safe_identifier`].
    pub fn quote(self, identifier: &str) -> String {
        match self {
            SqlDialect::Postgres => format!("\"{identifier}\""),
            SqlDialect::MySql => format!("`{identifier}`"),
        }
    }

    pub fn list_databases_sql(self) -> &'static str {
        match self {
            SqlDialect::Postgres => {
                "SELECT datname::text AS name, \
                 pg_catalog.pg_get_userbyid(datdba)::text AS owner, \
                 pg_catalog.pg_encoding_to_char(encoding)::text AS encoding \
                 FROM pg_catalog.pg_database \
                 WHERE NOT datistemplate \
                 ORDER BY datname"
            }
            SqlDialect::MySql => {
                "SELECT SCHEMA_NAME AS name, \
                 DEFAULT_CHARACTER_SET_NAME AS charset, \
                 DEFAULT_COLLATION_NAME AS collation \
                 FROM information_schema.SCHEMATA \
                 ORDER BY SCHEMA_NAME"
            }
        }
    }

    pub fn list_tables_sql(self) -> &'static str {
        match self {
            SqlDialect::Postgres => {
                "SELECT table_name::text AS table_name, table_type::text AS table_type \
                 FROM information_schema.tables \
                 WHERE table_schema = $1 \
                 ORDER BY table_name"
            }
            SqlDialect::MySql => {
                "SELECT TABLE_NAME AS table_name, TABLE_TYPE AS table_type, \
                 TABLE_ROWS AS approximate_rows \
                 FROM information_schema.TABLES \
                 WHERE TABLE_SCHEMA = ? \
                 ORDER BY TABLE_NAME"
            }
        }
    }

    pub fn describe_table_sql(self) -> &'static str {
        match self {
            SqlDialect::Postgres => {
                "SELECT column_name::text AS column_name, data_type::text AS data_type, \
                 is_nullable::text AS is_nullable, column_default::text AS column_default, \
                 character_maximum_length::int4 AS max_length \
                 FROM information_schema.columns \
                 WHERE table_schema = $1 AND table_name = $2 \
                 ORDER BY ordinal_position"
            }
            SqlDialect::MySql => {
                "SELECT COLUMN_NAME AS column_name, COLUMN_TYPE AS data_type, \
                 IS_NULLABLE AS is_nullable, COLUMN_DEFAULT AS column_default, \
                 COLUMN_KEY AS column_key, EXTRA AS extra \
                 FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ? \
                 ORDER BY ORDINAL_POSITION"
            }
        }
    }

    pub fn database_exists_sql(self) -> &'static str {
        match self {
            SqlDialect::Postgres => "SELECT 1 AS found FROM pg_catalog.pg_database WHERE datname = $1",
            SqlDialect::MySql => "SELECT 1 AS found FROM information_schema.SCHEMATA WHERE SCHEMA_NAME = ?",
        }
    }

    /// Role lookup for `OWNER`; `None` where databases have no owner.
    pub fn role_exists_sql(self) -> Option<&'static str> {
        match self {
            SqlDialect::Postgres => Some("SELECT 1 AS found FROM pg_catalog.pg_roles WHERE rolname = $1"),
            SqlDialect::MySql => None,
        }
    }

    /// `CREATE DATABASE` for identifiers that passed validation.
    pub fn create_database_sql(self, name: &str, owner: Option<&str>) -> String {
        let mut sql = format!("CREATE DATABASE {}", self.quote(name));
        if let Some(owner) = owner {
            sql.push_str(" OWNER ");
            sql.push_str(&self.quote(owner));
        }
        sql
    }
}

/// Holds a leased session in autocommit mode and restores the previous mode
/// when dropped, including when the owning future is cancelled.
struct AutocommitScope {
    session: Lease<Box<dyn SqlSession>>,
    previous: bool,
}

impl AutocommitScope {
    fn enter(mut session: Lease<Box<dyn SqlSession>>) -> Self {
        let previous = session.autocommit();
        session.set_autocommit(true);
        Self { session, previous }
    }
}

impl Drop for AutocommitScope {
    fn drop(&mut self) {
        self.session.set_autocommit(self.previous);
    }
}

/// A relational backend: dialect + handle slot + deadlines.
pub struct RelationalStore {
    dialect: SqlDialect,
    slot: ConnectionSlot<Box<dyn SqlSession>>,
    deadlines: Deadlines,
    default_schema: String,
}

impl RelationalStore {
    pub fn new(
        dialect: SqlDialect,
        provider: Arc<dyn ConnectionProvider<Handle = Box<dyn SqlSession>>>,
        deadlines: Deadlines,
        default_schema: impl Into<String>,
    ) -> Self {
        Self {
            dialect,
            slot: ConnectionSlot::new(provider, deadlines.connect),
            deadlines,
            default_schema: default_schema.into(),
        }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn slot(&self) -> &ConnectionSlot<Box<dyn SqlSession>> {
        &self.slot
    }

    /// Schema used when a caller does not name one.
    pub fn default_schema(&self) -> &str {
        &self.default_schema
    }

    pub async fn list_databases(&self) -> Result<Vec<Row>> {
        self.fetch(self.dialect.list_databases_sql(), &[]).await
    }

    pub async fn list_tables(&self, schema: Option<&str>) -> Result<Vec<Row>> {
        let schema = schema.unwrap_or(&self.default_schema);
        self.fetch(self.dialect.list_tables_sql(), &[schema]).await
    }

    pub async fn describe_table(&self, table: &str, schema: Option<&str>) -> Result<Vec<Row>> {
        let schema = schema.unwrap_or(&self.default_schema);
        self.fetch(self.dialect.describe_table_sql(), &[schema, table])
            .await
    }

    /// Create a database unless it already exists.
    ///
    /// Identifiers are validated before the connection is touched. The
    /// session's autocommit mode is switched on for the `CREATE` and restored
    /// afterwards on every path.
    pub async fn create_database(&self, name: &str, owner: Option<&str>) -> Result<CreateOutcome> {
        let max_len = self.dialect.max_identifier_len();
        if !is_safe_identifier(name, max_len) {
            return Err(Error::validation(format!(
                "Invalid database name '{name}': use only letters, digits and underscores (max {max_len} characters)"
            )));
        }
        if let Some(owner) = owner {
            if self.dialect.role_exists_sql().is_none() {
                return Err(Error::validation(format!(
                    "{} databases have no owner; omit the owner argument",
                    self.dialect.backend().display_name()
                )));
            }
            if !is_safe_identifier(owner, max_len) {
                return Err(Error::validation(format!(
                    "Invalid owner name '{owner}': use only letters, digits and underscores"
                )));
            }
        }

        let query_deadline = self.deadlines.query;
        let mut session = self.slot.lease().await?;

        let existing = with_deadline(
            query_deadline,
            "database lookup",
            session.fetch(self.dialect.database_exists_sql(), &[name]),
        )
        .await?;
        if !existing.is_empty() {
            tracing::info!(backend = %self.dialect.backend(), database = name, "database already exists");
            return Ok(CreateOutcome::AlreadyExists);
        }

        if let (Some(owner), Some(role_sql)) = (owner, self.dialect.role_exists_sql()) {
            let roles =
                with_deadline(query_deadline, "owner lookup", session.fetch(role_sql, &[owner])).await?;
            if roles.is_empty() {
                return Err(Error::validation(format!("Owner role '{owner}' does not exist")));
            }
        }

        let statement = self.dialect.create_database_sql(name, owner);
        let mut scope = AutocommitScope::enter(session);
        let created = with_deadline(query_deadline, "CREATE DATABASE", scope.session.execute(&statement)).await;
        drop(scope);
        created?;

        tracing::info!(backend = %self.dialect.backend(), database = name, "database created");
        Ok(CreateOutcome::Created)
    }

    async fn fetch(&self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let mut session = self.slot.lease().await?;
        with_deadline(self.deadlines.query, "catalog query", session.fetch(sql, params)).await
    }
}

#[async_trait]
impl QueryBackend for RelationalStore {
    fn kind(&self) -> BackendKind {
        self.dialect.backend()
    }

    async fn execute(&self, statement: &str) -> Result<Vec<Row>> {
        let mut session = self.slot.lease().await?;
        with_deadline(self.deadlines.query, "query", session.fetch(statement, &[])).await
    }
}

impl fmt::Debug for RelationalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationalStore")
            .field("dialect", &self.dialect)
            .field("slot", &self.slot)
            .field("default_schema", &self.default_schema)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_statements_quote_identifiers() {
        assert_eq!(
            SqlDialect::Postgres.create_database_sql("affirmation_app", None),
            "CREATE DATABASE \"affirmation_app\""
        );
        assert_eq!(
            SqlDialect::Postgres.create_database_sql("affirmation_app", Some("app_owner")),
            "CREATE DATABASE \"affirmation_app\" OWNER \"app_owner\""
        );
        assert_eq!(
            SqlDialect::MySql.create_database_sql("shop", None),
            "CREATE DATABASE `shop`"
        );
    }

    #[test]
    fn catalog_lookups_use_bind_parameters() {
        assert!(SqlDialect::Postgres.database_exists_sql().contains("$1"));
        assert!(SqlDialect::MySql.database_exists_sql().contains('?'));
        assert!(SqlDialect::Postgres.describe_table_sql().contains("$2"));
        assert!(SqlDialect::MySql.role_exists_sql().is_none());
    }
}
