//! Newline-delimited JSON-RPC over stdin/stdout.

use std::sync::Arc;

use comfy_bridge_common::{JsonRpcResponse, RpcError};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use super::{Incoming, McpServer};

/// Serve the process's stdin/stdout until stdin closes.
pub async fn run(server: Arc<McpServer>) -> std::io::Result<()> {
    tracing::info!("Serving MCP over stdio");
    serve(server, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Read one message per line from `reader` and write responses to `writer`.
///
/// Requests run in their own task so a long `wait_for_completion` does not
/// block other calls. Each request is registered for cancellation before its
/// task starts. Notifications are handled inline, in arrival order.
/// Responses go through a single writer task and may be interleaved in
/// completion order. When the reader hits EOF every in-flight request is
/// cancelled and the remaining responses are flushed.
pub async fn serve<R, W>(server: Arc<McpServer>, reader: R, writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    let writer_task = tokio::spawn(write_responses(rx, writer));

    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let value = match serde_json::from_str::<Value>(&line) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("MCP server: unparseable message: {}", e);
                let _ = tx.send(JsonRpcResponse::failure(
                    None,
                    RpcError::parse_error(e.to_string()),
                ));
                continue;
            }
        };

        match server.accept(value) {
            Err(response) => {
                let _ = tx.send(response);
            }
            Ok(Incoming::Notification(message)) => server.notify(&message),
            Ok(Incoming::Request(request)) => {
                let server = server.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    let _ = tx.send(server.run(request).await);
                });
            }
        }
    }

    tracing::info!("stdin closed, shutting down");
    server.cancel_all();
    drop(tx);

    writer_task
        .await
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?
}

async fn write_responses<W>(
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
    mut writer: W,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = match serde_json::to_vec(&response) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!("Failed to serialize response: {}", e);
                continue;
            }
        };
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    Ok(())
}
