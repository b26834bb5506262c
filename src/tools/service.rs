//! Service-level tools: `health_check` and `list_services`.

use crate::backend::BackendKind;
use crate::tools::hub::Hub;
use serde_json::{json, Map, Value};

pub const SERVICE_NAME: &str = "bigtorig-mcp-hub";

/// Liveness report with connection state per backend and tool health.
///
/// Reads state only; it never opens a connection.
pub fn health_check(hub: &Hub) -> Value {
    let backends: Map<String, Value> = hub
        .endpoints()
        .iter()
        .map(|(kind, endpoint)| {
            let (connected, opened) = hub.backends().connection_state(*kind);
            (
                kind.as_str().to_string(),
                json!({
                    "name": kind.display_name(),
                    "endpoint": endpoint,
                    "connected": connected,
                    "connections_opened": opened,
                }),
            )
        })
        .collect();

    let report = hub.health_report();
    let tools: Map<String, Value> = report
        .tools
        .iter()
        .map(|(name, tool)| (name.clone(), json!(tool)))
        .collect();

    json!({
        "status": "healthy",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
        "message": "MCP hub is operational",
        "uptime_seconds": hub.uptime_secs(),
        "backends": backends,
        "tools": {
            "status": report.status,
            "summary": report.summary,
            "by_tool": tools,
        },
    })
}

/// The backends behind the hub and the tools each one serves.
pub fn list_services(hub: &Hub) -> Value {
    let services: Map<String, Value> = hub
        .endpoints()
        .iter()
        .map(|(kind, endpoint)| (kind.as_str().to_string(), service_entry(hub, *kind, endpoint)))
        .collect();

    json!({
        "total_services": services.len(),
        "services": services,
    })
}

fn service_entry(hub: &Hub, kind: BackendKind, endpoint: &str) -> Value {
    json!({
        "name": kind.display_name(),
        "endpoint": endpoint,
        "status": "available",
        "tools": hub.catalog().names_for(kind),
    })
}
