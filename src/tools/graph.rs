//! Graph tool handlers.

use crate::backend::GraphStore;
use crate::envelope::Envelope;
use crate::types::Result;
use serde_json::Value;

pub async fn list_nodes(store: &GraphStore, label: Option<&str>, limit: u32) -> Result<Value> {
    let nodes = store.list_nodes(label, limit).await?;
    Ok(Envelope::success()
        .rows("node_count", "nodes", nodes)
        .field("label", label)
        .field("limit", limit)
        .into_value())
}

pub async fn list_relationships(store: &GraphStore, rel_type: Option<&str>, limit: u32) -> Result<Value> {
    let relationships = store.list_relationships(rel_type, limit).await?;
    Ok(Envelope::success()
        .rows("relationship_count", "relationships", relationships)
        .field("relationship_type", rel_type)
        .field("limit", limit)
        .into_value())
}
