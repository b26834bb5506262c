//! Qdrant backend over its REST API.

use crate::backend::{BackendKind, ConnectionProvider, VectorSession};
use crate::types::{Error, QdrantConfig, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use std::time::Duration;

/// Opens Qdrant REST sessions from configuration.
#[derive(Debug, Clone)]
pub struct QdrantConnector {
    client: Client,
    config: QdrantConfig,
}

impl QdrantConnector {
    pub fn new(config: &QdrantConfig, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::connection(format!("Qdrant HTTP client: {e}")))?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn base_url(&self) -> Result<Url> {
        let base = Url::parse(&self.config.url)
            .map_err(|e| Error::connection(format!("invalid QDRANT_URL '{}': {e}", self.config.url)))?;
        if !matches!(base.scheme(), "http" | "https") || base.cannot_be_a_base() {
            return Err(Error::connection(format!(
                "QDRANT_URL '{}' must be an http(s) URL",
                self.config.url
            )));
        }
        Ok(base)
    }
}

#[async_trait]
impl ConnectionProvider for QdrantConnector {
    type Handle = Box<dyn VectorSession>;

    fn backend(&self) -> BackendKind {
        BackendKind::Qdrant
    }

    async fn acquire(&self) -> Result<Box<dyn VectorSession>> {
        let mut session = QdrantSession {
            client: self.client.clone(),
            base: self.base_url()?,
            api_key: self.config.api_key.clone(),
            broken: false,
        };
        let root = session
            .get(&[])
            .await
            .map_err(|e| Error::connection(format!("Qdrant at {}: {e}", self.config.url)))?;
        let version = root.get("version").and_then(serde_json::Value::as_str);
        tracing::debug!(version, "qdrant reachable");
        Ok(Box::new(session))
    }

    async fn is_alive(&self, handle: &mut Box<dyn VectorSession>) -> bool {
        handle.is_open()
    }
}

/// A REST session against one Qdrant server.
#[derive(Debug)]
pub struct QdrantSession {
    client: Client,
    base: Url,
    api_key: Option<String>,
    broken: bool,
}

impl QdrantSession {
    /// GET `base/segments...` and return the decoded body.
    async fn get(&mut self, segments: &[&str]) -> Result<Value> {
        let mut url = self.base.clone();
        if !segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| Error::validation("Qdrant URL cannot carry a path"))?
                .pop_if_empty()
                .extend(segments);
        }

        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.header("api-key", key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => {
                if err.is_connect() || err.is_timeout() || err.is_request() {
                    self.broken = true;
                }
                return Err(Error::backend(format!("Qdrant request failed: {err}")));
            }
        };

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| Error::backend(format!("Qdrant response could not be read: {err}")))?;
        decode_body(status, &bytes)
    }
}

/// Successful responses must carry JSON; error bodies are best effort.
fn decode_body(status: StatusCode, bytes: &[u8]) -> Result<Value> {
    if status.is_success() {
        return serde_json::from_slice(bytes)
            .map_err(|err| Error::backend(format!("Qdrant returned an unreadable body: {err}")));
    }
    let body = serde_json::from_slice(bytes).unwrap_or(Value::Null);
    Err(status_error(status, &body))
}

/// Prefer the server's own `status.error` text over the bare HTTP status.
fn status_error(status: StatusCode, body: &Value) -> Error {
    match body.pointer("/status/error").and_then(Value::as_str) {
        Some(message) => Error::backend(message),
        None if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN => {
            Error::backend("Qdrant rejected the configured API key")
        }
        None => Error::backend(format!("Qdrant answered HTTP {status}")),
    }
}

#[async_trait]
impl VectorSession for QdrantSession {
    async fn list_collections(&mut self) -> Result<Vec<String>> {
        let body = self.get(&["collections"]).await?;
        let names = body
            .pointer("/result/collections")
            .and_then(Value::as_array)
            .map(|collections| {
                collections
                    .iter()
                    .filter_map(|c| c.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        Ok(names)
    }

    async fn collection_info(&mut self, name: &str) -> Result<Value> {
        let mut body = self.get(&["collections", name]).await?;
        Ok(body
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    fn is_open(&self) -> bool {
        !self.broken
    }
}
