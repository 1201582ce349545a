//! Persistent library index
//!
//! [`Library`] keeps the index in memory behind a lock and writes the whole
//! list under the `books` key after every mutation. Removing metadata never
//! touches book content; callers delete content as a separate step.

mod index;

pub use index::{filter_by_collection, search, sort_records, LibraryIndex, Membership, SortOrder};

use crate::error::StorageError;
use crate::storage::{keys, Store};
use crate::types::{BookPatch, BookRecord};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared handle to the library index
#[derive(Clone)]
pub struct Library {
    index: Arc<RwLock<LibraryIndex>>,
    store: Store,
}

impl Library {
    /// Create an empty library over `store` without reading it
    pub fn new(store: Store) -> Self {
        Self {
            index: Arc::new(RwLock::new(LibraryIndex::new())),
            store,
        }
    }

    /// Open the library, reading the persisted index
    pub async fn load(store: Store) -> Self {
        let records: Vec<BookRecord> = store.get_json(keys::BOOKS).await.unwrap_or_default();
        tracing::debug!(books = records.len(), "Loaded library index");
        Self {
            index: Arc::new(RwLock::new(LibraryIndex::from_records(records))),
            store,
        }
    }

    /// Snapshot of every record
    pub async fn list(&self) -> Vec<BookRecord> {
        self.index.read().await.records().to_vec()
    }

    pub async fn get(&self, id: &str) -> Option<BookRecord> {
        self.index.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.index.read().await.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.index.read().await.len()
    }

    /// Insert or replace a record, then persist
    pub async fn upsert(&self, record: BookRecord) -> Result<(), StorageError> {
        self.index.write().await.upsert(record);
        self.persist().await
    }

    /// Merge a partial update, then persist. Returns the updated record.
    pub async fn merge(&self, id: &str, patch: &BookPatch) -> Result<Option<BookRecord>, StorageError> {
        let updated = self.index.write().await.merge(id, patch).cloned();
        if updated.is_some() {
            self.persist().await?;
        }
        Ok(updated)
    }

    /// Remove a record's metadata, then persist
    pub async fn remove(&self, id: &str) -> Result<Option<BookRecord>, StorageError> {
        let removed = self.index.write().await.remove(id);
        if removed.is_some() {
            self.persist().await?;
        }
        Ok(removed)
    }

    /// Remove every record's metadata, then persist
    pub async fn clear(&self) -> Result<Vec<BookRecord>, StorageError> {
        let removed = self.index.write().await.clear();
        self.persist().await?;
        Ok(removed)
    }

    /// Update the reading position in memory only
    ///
    /// Returns false when the book is no longer in the library.
    pub async fn set_progress_in_memory(&self, id: &str, cfi: &str, progress: u8) -> bool {
        self.index
            .write()
            .await
            .merge(id, &BookPatch::position(cfi, progress))
            .is_some()
    }

    /// Write the whole index to storage
    pub async fn persist(&self) -> Result<(), StorageError> {
        let snapshot = self.index.read().await.clone();
        self.store.set_json(keys::BOOKS, &snapshot).await
    }
}
