//! Lumina Server - loopback book server and library API

use anyhow::{Context, Result};
use lumina_core::Config;
use lumina_server::{routes, state};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumina_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    let port: u16 = match std::env::var("LUMINA_SERVER_PORT") {
        Ok(value) => value
            .parse()
            .with_context(|| format!("Invalid LUMINA_SERVER_PORT: {}", value))?,
        Err(_) => 0,
    };

    // Create application state
    let state = state::AppState::new(&config).await?;

    // Build router
    let app = routes::create_router(state);

    // Start server
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        "Starting server on {}",
        listener.local_addr()?
    );

    axum::serve(listener, app).await?;

    Ok(())
}
