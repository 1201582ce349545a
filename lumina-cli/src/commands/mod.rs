//! CLI command implementations

mod annotations;
mod collections;
mod import;
mod library;
mod read;
mod serve;
mod settings;

pub use annotations::{bookmarks, highlights, BookmarkCommand, HighlightCommand};
pub use collections::{collections, CollectionCommand};
pub use import::import;
pub use library::{clear, edit, list, remove, EditArgs};
pub use read::{read, search};
pub use serve::serve;
pub use settings::{settings, SettingsArgs};

use anyhow::{Context, Result};
use lumina_core::content::{LocalShell, ShellBridge};
use lumina_core::{App, Config};
use lumina_server::state::AppState;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Options shared by every command
pub struct Options {
    pub data_dir: Option<PathBuf>,
    pub desktop: bool,
}

impl Options {
    pub fn config(&self) -> Config {
        let config = Config::from_env();
        match &self.data_dir {
            Some(dir) => config.with_data_dir(dir),
            None => config,
        }
    }
}

/// An opened application, plus the book server when running as the desktop shell
pub struct Workspace {
    pub app: App,
    server: Option<JoinHandle<()>>,
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if let Some(server) = self.server.take() {
            server.abort();
        }
    }
}

/// Open the application described by `opts`
pub async fn open(opts: &Options) -> Result<Workspace> {
    let config = opts.config();
    tracing::debug!(data_dir = %config.data_dir.display(), desktop = opts.desktop, "Opening library");

    if !opts.desktop {
        let app = App::open(config, None)
            .await
            .context("Failed to open the library")?;
        return Ok(Workspace { app, server: None });
    }

    let state = AppState::new(&config)
        .await
        .context("Failed to prepare the book server")?;
    let (addr, server) = lumina_server::spawn(state, SocketAddr::from(([127, 0, 0, 1], 0))).await?;
    let shell: Arc<dyn ShellBridge> = Arc::new(LocalShell::new(config.books_dir(), addr.port()));

    match App::open(config, Some(shell)).await {
        Ok(app) => Ok(Workspace {
            app,
            server: Some(server),
        }),
        Err(e) => {
            server.abort();
            Err(e).context("Failed to open the library")
        }
    }
}
