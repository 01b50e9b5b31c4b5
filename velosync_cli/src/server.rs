//! Minimal HTTP trigger endpoint
//!
//! A single-purpose listener exposing `GET /sync_latest`, which runs the
//! single-latest pipeline and answers with HTTP 200 and a JSON body in both
//! outcomes; internal failures are reported in the body, not as HTTP error
//! statuses. Requests are handled strictly one at a time, matching the
//! pipeline's sequential model.

use std::sync::Arc;

use anyhow::Result;
use log::{info, warn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use velosync_core::ActivityProcessor;

/// Bind and serve forever on the given port
pub async fn serve(processor: Arc<ActivityProcessor>, port: u16) -> Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("Listening on http://0.0.0.0:{port} (GET /sync_latest)");
    serve_on(listener, processor).await
}

/// Serve on an already-bound listener (used by tests with an OS-picked port)
pub async fn serve_on(listener: TcpListener, processor: Arc<ActivityProcessor>) -> Result<()> {
    loop {
        let (mut stream, peer) = listener.accept().await?;
        if let Err(e) = handle_connection(&processor, &mut stream).await {
            warn!("Failed to handle request from {peer}: {e}");
        }
    }
}

async fn handle_connection(
    processor: &ActivityProcessor,
    stream: &mut TcpStream,
) -> Result<()> {
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).await?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let request_line = request.lines().next().unwrap_or_default();

    let (status, body) = if request_line.starts_with("GET /sync_latest ") {
        info!("Sync triggered over HTTP");
        let summary = processor.process_latest_activity().await;
        let body = serde_json::json!({
            "success": summary.is_success(),
            "summary": summary,
        });
        ("200 OK", body.to_string())
    } else {
        let body = serde_json::json!({
            "success": false,
            "error": "unknown endpoint, try GET /sync_latest",
        });
        ("404 Not Found", body.to_string())
    };

    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await?;
    Ok(())
}
