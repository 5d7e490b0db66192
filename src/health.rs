//! Liveness endpoint for external uptime probes.
//!
//! `GET /` answers 200 with a static body while the process is up. It says
//! nothing about gateway connectivity.

use std::net::SocketAddr;

use anyhow::Context;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// Body returned by the liveness endpoint.
pub const LIVENESS_BODY: &str = "Bot is running!";

/// Liveness handler.
pub async fn liveness_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, LIVENESS_BODY)
}

/// Router exposing the liveness endpoint.
pub fn router() -> Router {
    Router::new().route("/", get(liveness_handler))
}

/// Bind `host:port` and serve the liveness router until the task is dropped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("failed to bind liveness server on {host}:{port}"))?;
    let addr: SocketAddr = listener.local_addr()?;
    info!(%addr, "liveness server listening");

    axum::serve(listener, router())
        .await
        .context("liveness server failed")
}
