//! Serve command implementation

use super::Options;
use anyhow::{Context, Result};
use lumina_server::state::AppState;
use std::net::SocketAddr;

/// Run the book server until interrupted
pub async fn serve(opts: &Options, port: u16) -> Result<()> {
    let config = opts.config();
    let state = AppState::new(&config)
        .await
        .context("Failed to prepare the book server")?;

    let (addr, mut handle) =
        lumina_server::spawn(state, SocketAddr::from(([127, 0, 0, 1], port))).await?;
    println!("Serving {} on http://{}", config.books_dir().display(), addr);

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutting down");
        }
        result = &mut handle => {
            return result.context("Book server task failed");
        }
    }
    handle.abort();
    Ok(())
}
