//! PostgreSQL backend: `sqlx` connection handle and row decoding.

use crate::backend::{BackendKind, ConnectionProvider, Row, SqlSession};
use crate::types::{Error, Result, SqlConfig};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::postgres::{PgColumn, PgConnectOptions, PgConnection, PgRow};
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo, ValueRef};

/// Opens PostgreSQL handles from configuration.
#[derive(Debug, Clone)]
pub struct PgConnector {
    options: PgConnectOptions,
    endpoint: String,
}

impl PgConnector {
    pub fn new(config: &SqlConfig) -> Self {
        let mut options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database)
            .application_name(env!("CARGO_PKG_NAME"));
        if let Some(password) = &config.password {
            options = options.password(password);
        }
        Self {
            options,
            endpoint: config.endpoint(),
        }
    }
}

#[async_trait]
impl ConnectionProvider for PgConnector {
    type Handle = Box<dyn SqlSession>;

    fn backend(&self) -> BackendKind {
        BackendKind::Postgres
    }

    async fn acquire(&self) -> Result<Box<dyn SqlSession>> {
        let conn = PgConnection::connect_with(&self.options)
            .await
            .map_err(|e| Error::connection(format!("PostgreSQL at {}: {e}", self.endpoint)))?;
        Ok(Box::new(PgSession::new(conn)))
    }

    async fn is_alive(&self, handle: &mut Box<dyn SqlSession>) -> bool {
        handle.ping().await.is_ok()
    }
}

/// A single PostgreSQL connection. Starts in manual-commit mode, where reads
/// run in a transaction that is rolled back.
#[derive(Debug)]
pub struct PgSession {
    conn: PgConnection,
    autocommit: bool,
}

impl PgSession {
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn,
            autocommit: false,
        }
    }
}

#[async_trait]
impl SqlSession for PgSession {
    async fn fetch(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>> {
        let mut query = sqlx::query(sql);
        for param in params {
            query = query.bind(*param);
        }

        let rows = if self.autocommit {
            query.fetch_all(&mut self.conn).await?
        } else {
            let mut tx = self.conn.begin().await?;
            let rows = query.fetch_all(&mut *tx).await?;
            tx.rollback().await?;
            rows
        };

        Ok(rows.iter().map(row_to_map).collect())
    }

    async fn execute(&mut self, sql: &str) -> Result<u64> {
        let done = if self.autocommit {
            Executor::execute(&mut self.conn, sql).await?
        } else {
            let mut tx = self.conn.begin().await?;
            let done = Executor::execute(&mut *tx, sql).await?;
            tx.commit().await?;
            done
        };
        Ok(done.rows_affected())
    }

    async fn ping(&mut self) -> Result<()> {
        self.conn.ping().await.map_err(Error::from)
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    fn set_autocommit(&mut self, enabled: bool) {
        self.autocommit = enabled;
    }
}

/// Convert a row into a column-name → JSON map.
pub fn row_to_map(row: &PgRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_column(row, column)))
        .collect()
}

fn decode_column(row: &PgRow, column: &PgColumn) -> Value {
    let index = column.ordinal();
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    let type_name = column.type_info().name();
    let decoded: std::result::Result<Value, sqlx::Error> = match type_name {
        "BOOL" => row.try_get::<bool, _>(index).map(Value::from),
        "INT2" => row.try_get::<i16, _>(index).map(Value::from),
        "INT4" => row.try_get::<i32, _>(index).map(Value::from),
        "INT8" => row.try_get::<i64, _>(index).map(Value::from),
        "OID" => row.try_get::<sqlx::postgres::types::Oid, _>(index).map(|oid| Value::from(oid.0)),
        "FLOAT4" => row.try_get::<f32, _>(index).map(|v| Value::from(f64::from(v))),
        "FLOAT8" => row.try_get::<f64, _>(index).map(Value::from),
        "NUMERIC" => row
            .try_get::<sqlx::types::Decimal, _>(index)
            .map(|d| Value::String(d.to_string())),
        "JSON" | "JSONB" => row.try_get::<Value, _>(index),
        "UUID" => row
            .try_get::<sqlx::types::Uuid, _>(index)
            .map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|ts| Value::String(ts.to_rfc3339())),
        "TIMESTAMP" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|ts| Value::String(ts.to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|t| Value::String(t.to_string())),
        "BYTEA" => row
            .try_get::<Vec<u8>, _>(index)
            .map(|bytes| Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))),
        "TEXT[]" | "VARCHAR[]" | "NAME[]" => row.try_get::<Vec<String>, _>(index).map(Value::from),
        "INT4[]" => row.try_get::<Vec<i32>, _>(index).map(Value::from),
        "INT8[]" => row.try_get::<Vec<i64>, _>(index).map(Value::from),
        "BOOL[]" => row.try_get::<Vec<bool>, _>(index).map(Value::from),
        // text, varchar, name, enums, domains over text
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };

    decoded.unwrap_or_else(|err| {
        tracing::debug!(column = column.name(), type_name, %err, "column not decodable, returning null");
        Value::Null
    })
}
