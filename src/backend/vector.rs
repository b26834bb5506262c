//! Vector store: collection listing, metadata and the search placeholder.

use crate::backend::{with_deadline, ConnectionProvider, ConnectionSlot, Deadlines, Row};
use crate::types::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

/// Returned by search until an embedding step exists.
pub const SEARCH_NOTE: &str =
    "Vector search requires query embeddings; no embedding was performed, so no results are returned. \
     Collection metadata is included instead.";

/// Metadata keys copied from a collection description.
const INFO_KEYS: [&str; 7] = [
    "status",
    "optimizer_status",
    "points_count",
    "vectors_count",
    "indexed_vectors_count",
    "segments_count",
    "payload_schema",
];

/// A live vector database session.
#[async_trait]
pub trait VectorSession: Send {
    async fn list_collections(&mut self) -> Result<Vec<String>>;

    /// The server's raw description of one collection.
    async fn collection_info(&mut self, name: &str) -> Result<Value>;

    fn is_open(&self) -> bool;
}

/// Placeholder search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchStub {
    pub results: Vec<Value>,
    pub note: &'static str,
    pub collection: Row,
}

/// The vector backend: handle slot + deadlines.
pub struct VectorStore {
    slot: ConnectionSlot<Box<dyn VectorSession>>,
    deadlines: Deadlines,
}

impl VectorStore {
    pub fn new(
        provider: Arc<dyn ConnectionProvider<Handle = Box<dyn VectorSession>>>,
        deadlines: Deadlines,
    ) -> Self {
        Self {
            slot: ConnectionSlot::new(provider, deadlines.connect),
            deadlines,
        }
    }

    pub fn slot(&self) -> &ConnectionSlot<Box<dyn VectorSession>> {
        &self.slot
    }

    /// One `{name}` entry per collection.
    pub async fn list_collections(&self) -> Result<Vec<Row>> {
        let mut session = self.slot.lease().await?;
        let names = with_deadline(self.deadlines.query, "list collections", session.list_collections()).await?;
        Ok(names
            .into_iter()
            .map(|name| {
                let mut item = Row::new();
                item.insert("name".into(), Value::String(name));
                item
            })
            .collect())
    }

    pub async fn collection_info(&self, name: &str) -> Result<Row> {
        let mut session = self.slot.lease().await?;
        let raw = with_deadline(self.deadlines.query, "collection info", session.collection_info(name)).await?;
        Ok(normalize_collection(&raw))
    }

    /// Resolves the collection and returns its metadata with an empty result list.
    pub async fn search(&self, name: &str, query: &str, limit: u32) -> Result<SearchStub> {
        tracing::debug!(collection = name, query_len = query.len(), limit, "vector search without embedding");
        let collection = self.collection_info(name).await?;
        Ok(SearchStub {
            results: Vec::new(),
            note: SEARCH_NOTE,
            collection,
        })
    }
}

/// Copy the interesting parts of a collection description.
pub fn normalize_collection(raw: &Value) -> Row {
    let mut info = Row::new();
    for key in INFO_KEYS {
        if let Some(value) = raw.get(key) {
            info.insert(key.to_string(), value.clone());
        }
    }
    if let Some(vectors) = raw.pointer("/config/params/vectors") {
        info.insert("vector_params".into(), vectors.clone());
    }
    if !info.contains_key("status") {
        info.insert("status".into(), json!("unknown"));
    }
    info
}

impl fmt::Debug for VectorStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorStore")
            .field("slot", &self.slot)
            .field("deadlines", &self.deadlines)
            .finish()
    }
}
