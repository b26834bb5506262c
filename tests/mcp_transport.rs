//! MCP transports driven end to end: stdio over in-memory buffers and HTTP
//! on an ephemeral port.

mod support;

use mcp_hub::mcp::http::SESSION_HEADER;
use mcp_hub::mcp::{serve_lines, HttpTransport, McpHandler};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use support::Fixture;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

fn handler() -> (Fixture, Arc<McpHandler>) {
    let fx = Fixture::new();
    let handler = Arc::new(McpHandler::new(fx.hub.clone()));
    (fx, handler)
}

/// Feed `messages` through the stdio loop and collect every reply line.
async fn stdio_exchange(handler: &McpHandler, messages: &[Value]) -> Vec<Value> {
    let mut input = String::new();
    for message in messages {
        input.push_str(&message.to_string());
        input.push('\n');
    }
    let mut output = Vec::new();
    serve_lines(handler, input.as_bytes(), &mut output, CancellationToken::new())
        .await
        .unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

// =============================================================================
// stdio
// =============================================================================

#[tokio::test]
async fn stdio_session_handshake_and_tool_call() {
    let (fx, handler) = handler();

    let replies = stdio_exchange(
        &handler,
        &[
            json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize",
                    "params": { "protocolVersion": "2025-03-26", "capabilities": {} } }),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
            json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
            json!({ "jsonrpc": "2.0", "id": 3, "method": "tools/call",
                    "params": { "name": "postgres_query", "arguments": { "query": "SELECT * FROM users" } } }),
        ],
    )
    .await;

    // The notification gets no reply.
    assert_eq!(replies.len(), 3);

    assert_eq!(replies[0]["id"], json!(1));
    assert_eq!(replies[0]["result"]["protocolVersion"], json!("2025-03-26"));
    assert_eq!(replies[0]["result"]["serverInfo"]["name"], json!("bigtorig-mcp-hub"));

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 18);
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == json!("object")));

    let call = &replies[2]["result"];
    assert_eq!(call["isError"], json!(false));
    assert_eq!(call["structuredContent"]["row_count"], json!(3));
    assert_eq!(fx.postgres.opened(), 1);
}

#[tokio::test]
async fn stdio_reports_protocol_errors() {
    let (_fx, handler) = handler();

    let mut input = String::from("{not json\n\n");
    input.push_str(&json!({ "jsonrpc": "2.0", "id": 7, "method": "resources/list" }).to_string());
    input.push('\n');
    input.push_str(
        &json!({ "jsonrpc": "2.0", "id": 8, "method": "tools/call", "params": { "name": "redis_get" } })
            .to_string(),
    );
    input.push('\n');

    let mut output = Vec::new();
    serve_lines(&handler, input.as_bytes(), &mut output, CancellationToken::new())
        .await
        .unwrap();
    let replies: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["error"]["code"], json!(-32700));
    assert_eq!(replies[0]["id"], json!(null));
    assert_eq!(replies[1]["error"]["code"], json!(-32601));
    assert_eq!(replies[2]["error"]["code"], json!(-32602));
}

#[tokio::test]
async fn stdio_refusal_is_a_tool_error_not_a_protocol_error() {
    let (fx, handler) = handler();

    let replies = stdio_exchange(
        &handler,
        &[json!({ "jsonrpc": "2.0", "id": "q", "method": "tools/call",
                  "params": { "name": "mysql_query", "arguments": { "query": "DROP TABLE users" } } })],
    )
    .await;

    assert_eq!(replies[0]["id"], json!("q"));
    assert!(replies[0].get("error").is_none());
    assert_eq!(replies[0]["result"]["isError"], json!(true));
    assert_eq!(fx.mysql.opened(), 0);
}

#[tokio::test]
async fn stdio_stops_when_cancelled() {
    let (_fx, handler) = handler();
    let (client, server) = tokio::io::duplex(1024);
    let cancel = CancellationToken::new();

    let task = {
        let cancel = cancel.clone();
        let handler = handler.clone();
        tokio::spawn(async move {
            let reader = tokio::io::BufReader::new(server);
            serve_lines(&handler, reader, tokio::io::sink(), cancel).await
        })
    };

    cancel.cancel();
    let result = tokio::time::timeout(std::time::Duration::from_secs(2), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());
    drop(client);
}

// =============================================================================
// HTTP
// =============================================================================

async fn start_http_server(handler: Arc<McpHandler>) -> (SocketAddr, CancellationToken, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let cancel = CancellationToken::new();
    let transport = HttpTransport::new(addr, cancel.clone());

    let task = tokio::spawn(async move {
        transport.serve_on(listener, handler).await.unwrap();
    });
    (addr, cancel, task)
}

async fn post(client: &reqwest::Client, addr: SocketAddr, body: String) -> reqwest::Response {
    client
        .post(format!("http://{addr}/mcp"))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn http_initialize_issues_session_header() {
    let (_fx, handler) = handler();
    let (addr, cancel, task) = start_http_server(handler).await;
    let client = reqwest::Client::new();

    let response = post(
        &client,
        addr,
        json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize",
                "params": { "protocolVersion": "1999-01-01" } })
        .to_string(),
    )
    .await;

    assert_eq!(response.status(), 200);
    let session = response.headers().get(SESSION_HEADER).unwrap().to_str().unwrap().to_string();
    assert!(!session.is_empty());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["result"]["protocolVersion"], json!("2025-06-18"));

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn http_notification_is_accepted_without_body() {
    let (_fx, handler) = handler();
    let (addr, cancel, task) = start_http_server(handler).await;
    let client = reqwest::Client::new();

    let response = post(
        &client,
        addr,
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
    )
    .await;

    assert_eq!(response.status(), 202);
    assert!(response.headers().get(SESSION_HEADER).is_none());

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn http_tools_list_and_call() {
    let (fx, handler) = handler();
    let (addr, cancel, task) = start_http_server(handler).await;
    let client = reqwest::Client::new();

    let listed: Value = post(&client, addr, json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }).to_string())
        .await
        .json()
        .await
        .unwrap();
    let names: Vec<&str> = listed["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"neo4j_list_nodes"));
    assert!(names.contains(&"qdrant_collection_info"));

    let called: Value = post(
        &client,
        addr,
        json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/call",
                "params": { "name": "qdrant_list_collections" } })
        .to_string(),
    )
    .await
    .json()
    .await
    .unwrap();
    assert_eq!(called["result"]["structuredContent"]["collection_count"], json!(1));
    assert_eq!(fx.vector.opened.load(std::sync::atomic::Ordering::SeqCst), 1);

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn http_protocol_errors() {
    let (_fx, handler) = handler();
    let (addr, cancel, task) = start_http_server(handler).await;
    let client = reqwest::Client::new();

    let unparsable = post(&client, addr, "{oops".to_string()).await;
    assert_eq!(unparsable.status(), 400);
    let body: Value = unparsable.json().await.unwrap();
    assert_eq!(body["error"]["code"], json!(-32700));

    let unknown: Value = post(&client, addr, json!({ "jsonrpc": "2.0", "id": 9, "method": "prompts/list" }).to_string())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(unknown["error"]["code"], json!(-32601));
    assert_eq!(unknown["id"], json!(9));

    cancel.cancel();
    task.await.unwrap();
}

#[tokio::test]
async fn http_health_endpoint_never_connects() {
    let (fx, handler) = handler();
    let (addr, cancel, task) = start_http_server(handler).await;

    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(health["status"], json!("healthy"));
    assert_eq!(health["backends"]["qdrant"]["connected"], json!(false));
    assert_eq!(fx.postgres.opened(), 0);

    cancel.cancel();
    task.await.unwrap();
}
