//! Network endpoint: TCP bind with port-conflict retry, and the HTTP
//! surface the relay hangs off.

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::warn;

use crate::ws;
use crate::AppState;

/// Bind `port`, retrying on `port+1` after each conflict, up to `retries`
/// increments. Exhausting the budget is fatal to the caller.
pub async fn bind_with_retry(port: u16, retries: u32) -> anyhow::Result<TcpListener> {
    let mut attempt: u32 = 0;
    loop {
        let candidate = port
            .checked_add(attempt as u16)
            .context("bind retry walked past the last TCP port")?;

        match TcpListener::bind(("0.0.0.0", candidate)).await {
            Ok(listener) => {
                if attempt > 0 {
                    warn!("port {} was taken, bound {} instead", port, candidate);
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse && attempt < retries => {
                warn!("port {} in use, trying {}", candidate, candidate + 1);
                attempt += 1;
            }
            Err(e) => {
                return Err(e).context(format!(
                    "failed to bind a port in {}..={}",
                    port, candidate
                ));
            }
        }
    }
}

/// Router: the WebSocket endpoint plus a liveness probe.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

async fn health_check() -> &'static str {
    "OK - ripple relay"
}
