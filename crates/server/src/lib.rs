//! ripple relay server.
//!
//! Channel-based chat relay: persistent WebSocket connections, live fan-out
//! of posted messages to every connected client, and bounded chronological
//! history replays from MySQL.

pub mod config;
pub mod error;
pub mod listener;
pub mod registry;
pub mod relay;
pub mod store;
pub mod ws;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::ServerConfig;
use registry::ConnectionRegistry;
use relay::Relay;
use store::MySqlStore;

/// Shared state injected into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: ServerConfig,
    pub registry: Arc<ConnectionRegistry>,
    pub relay: Arc<Relay>,
}

pub async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        // Already set, ignore
    }

    info!("=== ripple relay ===");

    let config = ServerConfig::from_env();

    let store = Arc::new(MySqlStore::connect(&config));
    let registry = Arc::new(ConnectionRegistry::new());
    let relay = Arc::new(Relay::new(store));

    let state = AppState {
        config: config.clone(),
        registry,
        relay,
    };

    let tcp = listener::bind_with_retry(config.port, config.bind_retries).await?;
    info!("listening on {}", tcp.local_addr()?);

    let app = listener::router(state);
    axum::serve(tcp, app.into_make_service_with_connect_info::<SocketAddr>()).await?;

    Ok(())
}
