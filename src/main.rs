//! MCP hub server - main entry point.
//!
//! Serves the hub's tools over one of two transports:
//! - `http`: streamable HTTP on `POST /mcp` (default)
//! - `stdio`: newline-delimited JSON-RPC on stdin/stdout

use clap::{Parser, ValueEnum};
use mcp_hub::mcp::{serve_stdio, HttpTransport, McpHandler};
use mcp_hub::{Config, Hub};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Http,
    Stdio,
}

#[derive(Debug, Parser)]
#[command(name = "mcp-hub", version, about = "MCP hub for Postgres, MySQL, Neo4j and Qdrant")]
struct Cli {
    /// Transport to serve on.
    #[arg(long, env = "MCP_TRANSPORT", value_enum, default_value_t = Transport::Http)]
    transport: Transport,

    /// Bind host for the HTTP transport (overrides MCP_HOST).
    #[arg(long)]
    host: Option<String>,

    /// Bind port for the HTTP transport (overrides MCP_PORT).
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    // Initialize observability
    mcp_hub::observability::init_tracing(&config.observability);

    let hub = Arc::new(Hub::from_config(&config)?);
    let handler = Arc::new(McpHandler::new(hub.clone()));

    tracing::info!("🔌 bigtorig-mcp-hub {} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!("📡 Available tools: {}", hub.catalog().names().join(", "));
    tracing::info!(
        postgres = %config.postgres.endpoint(),
        mysql = %config.mysql.endpoint(),
        neo4j = %config.neo4j.uri,
        qdrant = %config.qdrant.url,
        "backends configured (connections open on first use)"
    );

    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, shutting down");
        }
        signal.cancel();
    });

    match cli.transport {
        Transport::Http => {
            let addr: SocketAddr = config.server.bind_addr().parse()?;
            tracing::info!("🚀 Ready to accept connections on http://{addr}/mcp");
            HttpTransport::new(addr, cancel).serve(handler).await?;
        }
        Transport::Stdio => {
            serve_stdio(&handler, cancel).await?;
        }
    }

    Ok(())
}
