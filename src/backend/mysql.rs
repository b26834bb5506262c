//! MySQL backend: `sqlx` connection handle and row decoding.

use crate::backend::{BackendKind, ConnectionProvider, Row, SqlSession};
use crate::types::{Error, Result, SqlConfig};
use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde_json::Value;
use sqlx::mysql::{MySqlColumn, MySqlConnectOptions, MySqlConnection, MySqlRow};
use sqlx::{Column, Connection, Executor, Row as _, TypeInfo, ValueRef};

/// Opens MySQL handles from configuration.
#[derive(Debug, Clone)]
pub struct MySqlConnector {
    options: MySqlConnectOptions,
    endpoint: String,
}

impl MySqlConnector {
    pub fn new(config: &SqlConfig) -> Self {
        let mut options = MySqlConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .database(&config.database);
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
impl ConnectionProvider for MySqlConnector {
    type Handle = Box<dyn SqlSession>;

    fn backend(&self) -> BackendKind {
        BackendKind::MySql
    }

    async fn acquire(&self) -> Result<Box<dyn SqlSession>> {
        let conn = MySqlConnection::connect_with(&self.options)
            .await
            .map_err(|e| Error::connection(format!("MySQL at {}: {e}", self.endpoint)))?;
        Ok(Box::new(MySqlSession::new(conn)))
    }

    async fn is_alive(&self, handle: &mut Box<dyn SqlSession>) -> bool {
        handle.ping().await.is_ok()
    }
}

/// A single MySQL connection. Starts in manual-commit mode, where reads run
/// in a transaction that is rolled back.
#[derive(Debug)]
pub struct MySqlSession {
    conn: MySqlConnection,
    autocommit: bool,
}

impl MySqlSession {
    pub fn new(conn: MySqlConnection) -> Self {
        Self {
            conn,
            autocommit: false,
        }
    }
}

#[async_trait]
impl SqlSession for MySqlSession {
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
pub fn row_to_map(row: &MySqlRow) -> Row {
    row.columns()
        .iter()
        .map(|column| (column.name().to_string(), decode_column(row, column)))
        .collect()
}

fn decode_column(row: &MySqlRow, column: &MySqlColumn) -> Value {
    let index = column.ordinal();
    match row.try_get_raw(index) {
        Ok(raw) if !raw.is_null() => {}
        _ => return Value::Null,
    }

    let type_name = column.type_info().name();
    let decoded: std::result::Result<Value, sqlx::Error> = match type_name {
        "BOOLEAN" => row.try_get::<bool, _>(index).map(Value::from),
        "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
            row.try_get::<i64, _>(index).map(Value::from)
        }
        "TINYINT UNSIGNED" | "SMALLINT UNSIGNED" | "MEDIUMINT UNSIGNED" | "INT UNSIGNED"
        | "BIGINT UNSIGNED" => row.try_get::<u64, _>(index).map(Value::from),
        "YEAR" => row.try_get::<u16, _>(index).map(Value::from),
        "FLOAT" => row.try_get::<f32, _>(index).map(|v| Value::from(f64::from(v))),
        "DOUBLE" => row.try_get::<f64, _>(index).map(Value::from),
        "DECIMAL" => row
            .try_get::<sqlx::types::Decimal, _>(index)
            .map(|d| Value::String(d.to_string())),
        "JSON" => row.try_get::<Value, _>(index),
        "TIMESTAMP" => row
            .try_get::<DateTime<Utc>, _>(index)
            .map(|ts| Value::String(ts.to_rfc3339())),
        "DATETIME" => row
            .try_get::<NaiveDateTime, _>(index)
            .map(|ts| Value::String(ts.to_string())),
        "DATE" => row
            .try_get::<NaiveDate, _>(index)
            .map(|d| Value::String(d.to_string())),
        "TIME" => row
            .try_get::<NaiveTime, _>(index)
            .map(|t| Value::String(t.to_string())),
        "BINARY" | "VARBINARY" | "BLOB" | "TINYBLOB" | "MEDIUMBLOB" | "LONGBLOB" | "BIT" => {
            row.try_get_unchecked::<Vec<u8>, _>(index).map(bytes_to_value)
        }
        // varchar, char, text, enum, set
        _ => row.try_get_unchecked::<String, _>(index).map(Value::String),
    };

    decoded.unwrap_or_else(|err| {
        tracing::debug!(column = column.name(), type_name, %err, "column not decodable, returning null");
        Value::Null
    })
}

/// Catalog tables often report text as binary; keep UTF-8 readable.
fn bytes_to_value(bytes: Vec<u8>) -> Value {
    match String::from_utf8(bytes) {
        Ok(text) => Value::String(text),
        Err(err) => Value::String(base64::engine::general_purpose::STANDARD.encode(err.into_bytes())),
    }
}
