//! Application state

use anyhow::Result;
use lumina_core::collections::Collections;
use lumina_core::storage::{Runtime, Store};
use lumina_core::{Config, Library};
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Directory holding `<id>.epub` files
    pub books_dir: PathBuf,

    /// Library index, shared with the reader when running in-process
    pub library: Library,

    pub collections: Collections,

    /// Largest accepted upload
    pub max_file_size: u64,

    /// Channel for SSE events
    pub event_tx: broadcast::Sender<ServerEvent>,
}

/// Server-sent events
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A book file was written
    BookStored { id: String, size: u64 },

    /// A book file was deleted
    BookDeleted { id: String },

    /// An error occurred
    Error { message: String },
}

impl AppState {
    /// Create state from configuration, opening the desktop store
    pub async fn new(config: &Config) -> Result<Self> {
        tokio::fs::create_dir_all(config.books_dir()).await?;
        tokio::fs::create_dir_all(config.store_dir()).await?;

        let store = Store::new(Runtime::Desktop.open_storage(config.store_dir()));
        let library = Library::load(store.clone()).await;
        let collections = Collections::load(store).await;

        Ok(Self::from_parts(
            config.books_dir(),
            library,
            collections,
            config.max_file_size,
        ))
    }

    /// Create state over services owned by someone else
    pub fn from_parts(
        books_dir: PathBuf,
        library: Library,
        collections: Collections,
        max_file_size: u64,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            books_dir,
            library,
            collections,
            max_file_size,
            event_tx,
        }
    }

    /// Validate that an ID is a safe filename
    /// Prevents path traversal attacks
    fn validate_id(id: &str) -> Result<()> {
        if !id.is_empty()
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            Ok(())
        } else {
            anyhow::bail!("Invalid ID format")
        }
    }

    /// Path of a book file, given a request path segment like `<id>.epub`
    pub fn book_file_path(&self, file: &str) -> Result<(String, PathBuf)> {
        let id = file
            .strip_suffix(".epub")
            .ok_or_else(|| anyhow::anyhow!("Only .epub files are served"))?;
        Self::validate_id(id)?;
        Ok((id.to_string(), self.books_dir.join(file)))
    }

    /// Subscribe to server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: ServerEvent) {
        // Ignore errors (no subscribers)
        let _ = self.event_tx.send(event);
    }
}
