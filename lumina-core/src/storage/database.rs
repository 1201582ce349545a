//! Single-document key-value store
//!
//! Small keys live in one JSON object on disk with base64 values. The
//! document is loaded on first use and rewritten atomically after every
//! mutation. Book content is kept out of the document: each `book_file_*`
//! value is a sibling file under `<name>.blobs/`, read on demand and never
//! cached, so a progress write does not touch stored books.

use super::{keys, validate_key, FileStorage, StorageProvider, StorageResult};
use crate::error::StorageError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

type Document = BTreeMap<String, String>;

/// Browser-store analogue backed by a single JSON file
pub struct DatabaseStorage {
    path: PathBuf,
    document: Mutex<Option<Document>>,
    blobs: FileStorage,
}

impl DatabaseStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let blobs = FileStorage::new(path.with_extension("blobs"));
        Self {
            path,
            document: Mutex::new(None),
            blobs,
        }
    }

    /// Directory holding book content
    pub fn blob_dir(&self) -> PathBuf {
        self.path.with_extension("blobs")
    }

    /// Read the document from disk
    ///
    /// A missing file is an empty store. An unparsable file is moved aside to
    /// `<name>.corrupt` before starting fresh. Any other read error is
    /// returned so nothing gets cached or overwritten.
    async fn load(&self) -> StorageResult<Document> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read store document: {}", e);
                return Err(StorageError::BackendError(e.to_string()));
            }
        };

        match serde_json::from_str(&data) {
            Ok(doc) => Ok(doc),
            Err(e) => {
                let aside = corrupt_path(&self.path);
                tokio::fs::rename(&self.path, &aside)
                    .await
                    .map_err(|e| StorageError::BackendError(e.to_string()))?;
                tracing::warn!(
                    path = %self.path.display(),
                    moved_to = %aside.display(),
                    "Store document is unreadable, starting fresh: {}",
                    e
                );
                Ok(Document::new())
            }
        }
    }

    async fn save(&self, document: &Document) -> StorageResult<()> {
        let data = serde_json::to_string(document)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::BackendError(e.to_string()))?;
        }

        // Write to temp file in same directory (ensures same filesystem for rename)
        let temp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, data)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    /// Run `f` against the loaded document
    ///
    /// When `f` reports a change, it is applied to a copy that replaces the
    /// cached document only once it has been saved.
    async fn with_document<T>(
        &self,
        f: impl FnOnce(&mut Document) -> (T, bool),
    ) -> StorageResult<T> {
        let mut guard = self.document.lock().await;
        let current = match guard.take() {
            Some(doc) => doc,
            None => self.load().await?,
        };

        let mut next = current.clone();
        let (result, dirty) = f(&mut next);
        if !dirty {
            *guard = Some(current);
            return Ok(result);
        }
        match self.save(&next).await {
            Ok(()) => {
                *guard = Some(next);
                Ok(result)
            }
            Err(e) => {
                *guard = Some(current);
                Err(e)
            }
        }
    }
}

fn corrupt_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".corrupt");
    PathBuf::from(name)
}

#[async_trait]
impl StorageProvider for DatabaseStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        if keys::is_book_file(key) {
            return self.blobs.get(key).await;
        }
        let encoded = self
            .with_document(|doc| (doc.get(key).cloned(), false))
            .await?;
        match encoded {
            Some(value) => STANDARD
                .decode(value)
                .map(Some)
                .map_err(|e| StorageError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        if keys::is_book_file(key) {
            return self.blobs.set(key, value).await;
        }
        let encoded = STANDARD.encode(value);
        self.with_document(|doc| {
            doc.insert(key.to_string(), encoded);
            ((), true)
        })
        .await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        if keys::is_book_file(key) {
            return self.blobs.remove(key).await;
        }
        self.with_document(|doc| {
            let removed = doc.remove(key).is_some();
            ((), removed)
        })
        .await
    }

    async fn clear(&self) -> StorageResult<()> {
        self.with_document(|doc| {
            let dirty = !doc.is_empty();
            doc.clear();
            ((), dirty)
        })
        .await?;
        self.blobs.clear().await
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut all: Vec<String> = self
            .with_document(|doc| (doc.keys().cloned().collect(), false))
            .await?;
        all.extend(self.blobs.keys().await?);
        all.sort();
        Ok(all)
    }

    fn name(&self) -> &'static str {
        "database"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");

        let storage = DatabaseStorage::new(&path);
        storage.set("book_file_1", vec![0, 159, 146, 150]).await.unwrap();
        storage.set("books", b"[]".to_vec()).await.unwrap();
        drop(storage);

        let reopened = DatabaseStorage::new(&path);
        assert_eq!(
            reopened.get("book_file_1").await.unwrap(),
            Some(vec![0, 159, 146, 150])
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["book_file_1", "books"]);
    }

    #[tokio::test]
    async fn test_book_content_stays_out_of_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let storage = DatabaseStorage::new(&path);

        storage.set("book_file_big", vec![7u8; 64 * 1024]).await.unwrap();
        let blob = storage.blob_dir().join("book_file_big");
        let written = std::fs::metadata(&blob).unwrap().modified().unwrap();

        storage.set("books", b"[{\"id\":\"big\"}]".to_vec()).await.unwrap();
        storage.set("books", b"[{\"id\":\"big\",\"progress\":40}]".to_vec()).await.unwrap();

        let document = std::fs::read_to_string(&path).unwrap();
        assert!(!document.contains("book_file_big"));
        assert!(document.len() < 1024);
        assert_eq!(std::fs::metadata(&blob).unwrap().modified().unwrap(), written);
        assert_eq!(storage.get("book_file_big").await.unwrap().unwrap().len(), 64 * 1024);

        storage.remove("book_file_big").await.unwrap();
        assert!(!blob.exists());
    }

    #[tokio::test]
    async fn test_clear_removes_content_too() {
        let dir = TempDir::new().unwrap();
        let storage = DatabaseStorage::new(dir.path().join("db.json"));
        storage.set("book_file_1", vec![1]).await.unwrap();
        storage.set("books", b"[]".to_vec()).await.unwrap();

        storage.clear().await.unwrap();
        assert!(storage.keys().await.unwrap().is_empty());
        assert_eq!(storage.get("book_file_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_cache_unchanged() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        let storage = DatabaseStorage::new(&path);
        storage.set("books", b"[]".to_vec()).await.unwrap();

        // A directory in the temp file's place makes the next save fail
        std::fs::create_dir(path.with_extension("json.tmp")).unwrap();
        assert!(storage.set("books", b"[1]".to_vec()).await.is_err());
        assert!(storage.set("collections", b"[]".to_vec()).await.is_err());

        assert_eq!(storage.get("books").await.unwrap(), Some(b"[]".to_vec()));
        assert_eq!(storage.keys().await.unwrap(), vec!["books"]);
    }

    #[tokio::test]
    async fn test_corrupt_document_is_moved_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        tokio::fs::write(&path, "not json").await.unwrap();

        let storage = DatabaseStorage::new(&path);
        assert_eq!(storage.get("books").await.unwrap(), None);
        storage.set("books", b"[]".to_vec()).await.unwrap();
        assert_eq!(storage.get("books").await.unwrap(), Some(b"[]".to_vec()));

        let kept = std::fs::read_to_string(dir.path().join("db.json.corrupt")).unwrap();
        assert_eq!(kept, "not json");
    }

    #[tokio::test]
    async fn test_unreadable_document_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.json");
        // A directory where the document should be fails to read as a file
        std::fs::create_dir(&path).unwrap();

        let storage = DatabaseStorage::new(&path);
        assert!(storage.get("books").await.is_err());
        assert!(storage.set("books", b"[]".to_vec()).await.is_err());
        assert!(path.is_dir());

        std::fs::remove_dir(&path).unwrap();
        std::fs::write(&path, r#"{"books":"WzFd"}"#).unwrap();
        assert_eq!(storage.get("books").await.unwrap(), Some(b"[1]".to_vec()));
    }
}
