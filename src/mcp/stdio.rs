//! stdio transport: one JSON-RPC message per line.
//!
//! stdout carries protocol traffic only; logs go to stderr.

use crate::mcp::McpHandler;
use crate::types::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

/// Serve newline-delimited messages from `reader` until EOF or cancellation.
pub async fn serve_lines<R, W>(
    handler: &McpHandler,
    reader: R,
    mut writer: W,
    cancel: CancellationToken,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("stdio transport shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            tracing::info!("stdin closed, shutting down");
            break;
        };

        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if let Some(reply) = handler.handle_raw(message).await {
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
    }
    Ok(())
}

/// Serve the process's stdin/stdout.
pub async fn serve_stdio(handler: &McpHandler, cancel: CancellationToken) -> Result<()> {
    tracing::info!("MCP stdio transport ready");
    serve_lines(handler, BufReader::new(tokio::io::stdin()), tokio::io::stdout(), cancel).await
}
