//! Lumina Server Library
//!
//! The loopback book server used by the desktop shell, plus a read-only
//! library API. This module exports the server components for testing and
//! reuse.

pub mod handlers;
pub mod routes;
pub mod state;

use anyhow::Result;
use state::AppState;
use std::net::SocketAddr;
use tokio::task::JoinHandle;

/// Bind `addr` and serve in the background
///
/// Returns the bound address, so binding port 0 yields the dynamic port the
/// reader should fetch from.
pub async fn spawn(state: AppState, addr: SocketAddr) -> Result<(SocketAddr, JoinHandle<()>)> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    let app = routes::create_router(state);

    tracing::info!("Book server listening on {}", local);
    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Book server stopped: {}", e);
        }
    });
    Ok((local, handle))
}
