//! Configuration structures.
//!
//! Configuration is read from environment variables. Every value has a fixed
//! default except backend passwords, which are passed through unchecked; a
//! missing credential surfaces as the driver's error on first connection.

use crate::types::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound on rows/records returned by any query tool.
pub const HARD_ROW_CAP: u32 = 1000;

/// Global hub configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MCP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Primary relational backend (PostgreSQL).
    #[serde(default = "SqlConfig::postgres")]
    pub postgres: SqlConfig,

    /// Secondary relational backend (MySQL).
    #[serde(default = "SqlConfig::mysql")]
    pub mysql: SqlConfig,

    /// Graph backend.
    #[serde(default)]
    pub neo4j: Neo4jConfig,

    /// Vector backend.
    #[serde(default)]
    pub qdrant: QdrantConfig,

    /// Row caps and deadlines.
    #[serde(default)]
    pub limits: QueryLimits,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            postgres: SqlConfig::postgres(),
            mysql: SqlConfig::mysql(),
            neo4j: Neo4jConfig::default(),
            qdrant: QdrantConfig::default(),
            limits: QueryLimits::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// MCP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind host.
    pub host: String,

    /// HTTP bind port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Connection parameters for a relational backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Database the handle connects to (also the default MySQL schema).
    pub database: String,
}

impl SqlConfig {
    pub fn postgres() -> Self {
        Self {
            host: "db".to_string(),
            port: 5432,
            user: "postgres".to_string(),
            password: None,
            database: "postgres".to_string(),
        }
    }

    pub fn mysql() -> Self {
        Self {
            host: "mysql".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: None,
            database: "mysql".to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Neo4j HTTP endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Neo4jConfig {
    /// Base URL of the Neo4j HTTP API (not the Bolt port).
    pub uri: String,
    pub user: String,
    #[serde(skip_serializing)]
    pub password: Option<String>,
    pub database: String,
}

impl Default for Neo4jConfig {
    fn default() -> Self {
        Self {
            uri: "http://neo4j:7474".to_string(),
            user: "neo4j".to_string(),
            password: None,
            database: "neo4j".to_string(),
        }
    }
}

/// Qdrant REST endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://qdrant:6333".to_string(),
            api_key: None,
        }
    }
}

/// Row caps and deadlines shared by every backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryLimits {
    /// Limit applied when the caller does not request one.
    pub default_limit: u32,

    /// Maximum rows/records per query. Requests above it are clamped.
    pub hard_cap: u32,

    /// Deadline for a single backend call.
    #[serde(with = "humantime_serde")]
    pub query_timeout: Duration,

    /// Deadline for opening or probing a handle.
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: 100,
            hard_cap: HARD_ROW_CAP,
            query_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing filter used when `RUST_LOG` is unset.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Unset or empty variables keep their defaults; malformed numbers and
    /// durations are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(host) = get("MCP_HOST") {
            config.server.host = host;
        }
        if let Some(port) = get("MCP_PORT") {
            config.server.port = parse_number("MCP_PORT", &port)?;
        }

        apply_sql(&mut config.postgres, "POSTGRES", "POSTGRES_DB", &get)?;
        apply_sql(&mut config.mysql, "MYSQL", "MYSQL_DATABASE", &get)?;

        if let Some(uri) = get("NEO4J_URI") {
            config.neo4j.uri = uri;
        }
        if let Some(user) = get("NEO4J_USER") {
            config.neo4j.user = user;
        }
        config.neo4j.password = get("NEO4J_PASSWORD");
        if let Some(database) = get("NEO4J_DATABASE") {
            config.neo4j.database = database;
        }

        if let Some(url) = get("QDRANT_URL") {
            config.qdrant.url = url;
        }
        config.qdrant.api_key = get("QDRANT_API_KEY");

        if let Some(limit) = get("MCP_DEFAULT_LIMIT") {
            let limit: u32 = parse_number("MCP_DEFAULT_LIMIT", &limit)?;
            config.limits.default_limit = limit.clamp(1, HARD_ROW_CAP);
        }
        if let Some(timeout) = get("MCP_QUERY_TIMEOUT") {
            config.limits.query_timeout = parse_duration("MCP_QUERY_TIMEOUT", &timeout)?;
        }
        if let Some(timeout) = get("MCP_CONNECT_TIMEOUT") {
            config.limits.connect_timeout = parse_duration("MCP_CONNECT_TIMEOUT", &timeout)?;
        }

        if let Some(format) = get("MCP_LOG_FORMAT") {
            config.observability.json_logs = format.eq_ignore_ascii_case("json");
        }
        if let Some(level) = get("RUST_LOG") {
            config.observability.log_level = level;
        }

        Ok(config)
    }
}

fn apply_sql<G>(target: &mut SqlConfig, prefix: &str, database_key: &str, get: &G) -> Result<()>
where
    G: Fn(&str) -> Option<String>,
{
    if let Some(host) = get(&format!("{prefix}_HOST")) {
        target.host = host;
    }
    let port_key = format!("{prefix}_PORT");
    if let Some(port) = get(&port_key) {
        target.port = parse_number(&port_key, &port)?;
    }
    if let Some(user) = get(&format!("{prefix}_USER")) {
        target.user = user;
    }
    target.password = get(&format!("{prefix}_PASSWORD"));
    if let Some(database) = get(database_key) {
        target.database = database;
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| Error::validation(format!("{key} must be a number, got '{raw}'")))
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration> {
    humantime_serde::re::humantime::parse_duration(raw.trim())
        .map_err(|e| Error::validation(format!("{key} is not a valid duration ('{raw}'): {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.server.bind_addr(), "0.0.0.0:8000");
        assert_eq!(config.postgres.endpoint(), "db:5432");
        assert_eq!(config.postgres.database, "postgres");
        assert_eq!(config.mysql.endpoint(), "mysql:3306");
        assert_eq!(config.neo4j.uri, "http://neo4j:7474");
        assert_eq!(config.qdrant.url, "http://qdrant:6333");
        assert_eq!(config.limits.default_limit, 100);
        assert_eq!(config.limits.hard_cap, 1000);
        assert!(config.postgres.password.is_none());
    }

    #[test]
    fn each_parameter_is_overridable() {
        let config = Config::from_lookup(lookup(&[
            ("POSTGRES_HOST", "10.0.0.5"),
            ("POSTGRES_PORT", "6543"),
            ("POSTGRES_USER", "app"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "affirmations"),
            ("MYSQL_DATABASE", "shop"),
            ("NEO4J_URI", "https://graph.internal:7473"),
            ("QDRANT_API_KEY", "k-123"),
            ("MCP_QUERY_TIMEOUT", "5s"),
            ("MCP_LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.postgres.endpoint(), "10.0.0.5:6543");
        assert_eq!(config.postgres.user, "app");
        assert_eq!(config.postgres.password.as_deref(), Some("secret"));
        assert_eq!(config.postgres.database, "affirmations");
        assert_eq!(config.mysql.database, "shop");
        assert_eq!(config.neo4j.uri, "https://graph.internal:7473");
        assert_eq!(config.qdrant.api_key.as_deref(), Some("k-123"));
        assert_eq!(config.limits.query_timeout, Duration::from_secs(5));
        assert!(config.observability.json_logs);
    }

    #[test]
    fn malformed_port_is_rejected() {
        let err = Config::from_lookup(lookup(&[("POSTGRES_PORT", "fivefour")])).unwrap_err();
        assert!(err.to_string().contains("POSTGRES_PORT"));
    }

    #[test]
    fn malformed_duration_is_rejected() {
        let err = Config::from_lookup(lookup(&[("MCP_CONNECT_TIMEOUT", "soon")])).unwrap_err();
        assert!(err.to_string().contains("MCP_CONNECT_TIMEOUT"));
    }

    #[test]
    fn default_limit_is_clamped_to_cap() {
        let config = Config::from_lookup(lookup(&[("MCP_DEFAULT_LIMIT", "50000")])).unwrap();
        assert_eq!(config.limits.default_limit, HARD_ROW_CAP);
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = Config::from_lookup(lookup(&[("MYSQL_HOST", "  ")])).unwrap();
        assert_eq!(config.mysql.host, "mysql");
    }
}
