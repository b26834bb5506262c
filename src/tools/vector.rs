//! Vector tool handlers.

use crate::backend::VectorStore;
use crate::envelope::Envelope;
use crate::types::Result;
use serde_json::Value;

pub async fn list_collections(store: &VectorStore) -> Result<Value> {
    let collections = store.list_collections().await?;
    Ok(Envelope::success()
        .rows("collection_count", "collections", collections)
        .into_value())
}

pub async fn collection_info(store: &VectorStore, name: &str) -> Result<Value> {
    let info = store.collection_info(name).await?;
    Ok(Envelope::success()
        .field("collection_name", name)
        .field("collection", info)
        .into_value())
}

pub async fn search(store: &VectorStore, name: &str, query: &str, limit: u32) -> Result<Value> {
    let stub = store.search(name, query, limit).await?;
    Ok(Envelope::success()
        .field("collection_name", name)
        .field("query", query)
        .field("limit", limit)
        .field("results", stub.results)
        .field("note", stub.note)
        .field("collection", stub.collection)
        .into_value())
}
