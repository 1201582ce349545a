//! Per-book bookmarks and highlights

use crate::error::StorageError;
use crate::storage::{keys, Store};
use crate::types::{Bookmark, Highlight};

/// Bookmark and highlight persistence, keyed by book id
#[derive(Clone)]
pub struct Annotations {
    store: Store,
}

impl Annotations {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn bookmarks(&self, book_id: &str) -> Vec<Bookmark> {
        self.store
            .get_json(&keys::bookmarks(book_id))
            .await
            .unwrap_or_default()
    }

    pub async fn add_bookmark(&self, book_id: &str, bookmark: Bookmark) -> Result<Bookmark, StorageError> {
        let mut bookmarks = self.bookmarks(book_id).await;
        bookmarks.push(bookmark.clone());
        self.store.set_json(&keys::bookmarks(book_id), &bookmarks).await?;
        Ok(bookmark)
    }

    /// Remove a bookmark, returning whether it existed
    pub async fn remove_bookmark(&self, book_id: &str, bookmark_id: &str) -> Result<bool, StorageError> {
        let mut bookmarks = self.bookmarks(book_id).await;
        let before = bookmarks.len();
        bookmarks.retain(|b| b.id != bookmark_id);
        if bookmarks.len() == before {
            return Ok(false);
        }
        self.store.set_json(&keys::bookmarks(book_id), &bookmarks).await?;
        Ok(true)
    }

    pub async fn highlights(&self, book_id: &str) -> Vec<Highlight> {
        self.store
            .get_json(&keys::highlights(book_id))
            .await
            .unwrap_or_default()
    }

    pub async fn add_highlight(&self, book_id: &str, highlight: Highlight) -> Result<Highlight, StorageError> {
        let mut highlights = self.highlights(book_id).await;
        highlights.push(highlight.clone());
        self.store.set_json(&keys::highlights(book_id), &highlights).await?;
        Ok(highlight)
    }

    pub async fn remove_highlight(&self, book_id: &str, highlight_id: &str) -> Result<bool, StorageError> {
        let mut highlights = self.highlights(book_id).await;
        let before = highlights.len();
        highlights.retain(|h| h.id != highlight_id);
        if highlights.len() == before {
            return Ok(false);
        }
        self.store.set_json(&keys::highlights(book_id), &highlights).await?;
        Ok(true)
    }

    /// Delete every annotation owned by a book
    pub async fn forget_book(&self, book_id: &str) -> Result<(), StorageError> {
        self.store.remove(&keys::bookmarks(book_id)).await?;
        self.store.remove(&keys::highlights(book_id)).await
    }
}
