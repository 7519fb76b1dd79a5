use anyhow::{Context, Result};
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Bind the HTTP listener. A port of 0 selects an OS-assigned ephemeral port.
pub async fn bind(port: u16) -> Result<TcpListener> {
    let addr = format!("0.0.0.0:{port}");
    TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))
}

/// Serve an empty router on the bound listener. No endpoints are defined;
/// the listener exists only to hold the port for the process lifetime.
pub async fn serve(listener: TcpListener) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .context("Failed to read bound address")?;
    info!("HTTP listener on {}", local_addr);

    axum::serve(listener, Router::new())
        .await
        .context("HTTP server error")
}
