//! Binary book content storage
//!
//! Content is stored apart from metadata. In the browser build it lives in
//! the key-value store under `book_file_<id>`; under the desktop shell the
//! shell writes files to disk and serves them over loopback HTTP.

use crate::error::{RetrievalError, StorageError};
use crate::storage::{keys, Store};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Storage for raw book bytes
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn save(&self, book_id: &str, content: Vec<u8>) -> Result<(), StorageError>;

    /// Fetch content; empty content is an error
    async fn load(&self, book_id: &str) -> Result<Vec<u8>, RetrievalError>;

    async fn delete(&self, book_id: &str) -> Result<(), StorageError>;
}

/// Content kept in the key-value store
#[derive(Clone)]
pub struct KvContentStore {
    store: Store,
}

impl KvContentStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ContentStore for KvContentStore {
    async fn save(&self, book_id: &str, content: Vec<u8>) -> Result<(), StorageError> {
        self.store.set_bytes(&keys::book_file(book_id), content).await
    }

    async fn load(&self, book_id: &str) -> Result<Vec<u8>, RetrievalError> {
        match self.store.backend().get(&keys::book_file(book_id)).await? {
            Some(bytes) if bytes.is_empty() => Err(RetrievalError::EmptyContent(book_id.to_string())),
            Some(bytes) => Ok(bytes),
            None => Err(RetrievalError::NotFound(book_id.to_string())),
        }
    }

    async fn delete(&self, book_id: &str) -> Result<(), StorageError> {
        self.store.remove(&keys::book_file(book_id)).await
    }
}

/// Native capabilities offered by the desktop shell
#[async_trait]
pub trait ShellBridge: Send + Sync {
    async fn save_book_file(&self, book_id: &str, content: Vec<u8>) -> Result<(), StorageError>;

    async fn delete_book_file(&self, book_id: &str) -> Result<(), StorageError>;

    /// Port of the loopback server serving `<id>.epub`
    async fn book_server_port(&self) -> Result<u16, StorageError>;
}

/// Shell bridge writing into the directory a local book server serves
pub struct LocalShell {
    books_dir: PathBuf,
    port: u16,
}

impl LocalShell {
    pub fn new(books_dir: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            books_dir: books_dir.into(),
            port,
        }
    }

    fn book_path(&self, book_id: &str) -> Result<PathBuf, StorageError> {
        crate::storage::validate_key(book_id)?;
        Ok(self.books_dir.join(format!("{}.epub", book_id)))
    }
}

#[async_trait]
impl ShellBridge for LocalShell {
    async fn save_book_file(&self, book_id: &str, content: Vec<u8>) -> Result<(), StorageError> {
        let path = self.book_path(book_id)?;
        tokio::fs::create_dir_all(&self.books_dir)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        let temp_path = path.with_extension("epub.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    async fn delete_book_file(&self, book_id: &str) -> Result<(), StorageError> {
        let path = self.book_path(book_id)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn book_server_port(&self) -> Result<u16, StorageError> {
        Ok(self.port)
    }
}

/// Content stored by the desktop shell and fetched over loopback HTTP
pub struct ShellContentStore {
    bridge: Arc<dyn ShellBridge>,
    client: reqwest::Client,
    timeout: Duration,
}

impl ShellContentStore {
    pub fn new(bridge: Arc<dyn ShellBridge>, timeout: Duration) -> Self {
        Self {
            bridge,
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ContentStore for ShellContentStore {
    async fn save(&self, book_id: &str, content: Vec<u8>) -> Result<(), StorageError> {
        self.bridge.save_book_file(book_id, content).await
    }

    async fn load(&self, book_id: &str) -> Result<Vec<u8>, RetrievalError> {
        let port = self.bridge.book_server_port().await?;
        let url = format!("http://127.0.0.1:{}/{}.epub", port, book_id);
        tracing::debug!(%url, "Fetching book from shell server");

        let classify = |e: reqwest::Error| {
            if e.is_timeout() {
                RetrievalError::Timeout(self.timeout)
            } else {
                RetrievalError::Network(e.to_string())
            }
        };

        let response = self
            .client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RetrievalError::NotFound(book_id.to_string()));
        }
        if status.is_server_error() {
            return Err(RetrievalError::Server(status.as_u16()));
        }
        if !status.is_success() {
            return Err(RetrievalError::Network(format!("unexpected status {}", status)));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        if bytes.is_empty() {
            return Err(RetrievalError::EmptyContent(book_id.to_string()));
        }
        Ok(bytes.to_vec())
    }

    async fn delete(&self, book_id: &str) -> Result<(), StorageError> {
        self.bridge.delete_book_file(book_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_kv_content_store() {
        let content = KvContentStore::new(Store::new(Arc::new(MemoryStorage::new())));
        content.save("b1", b"PK\x03\x04data".to_vec()).await.unwrap();
        assert_eq!(content.load("b1").await.unwrap(), b"PK\x03\x04data");

        content.delete("b1").await.unwrap();
        assert!(matches!(
            content.load("b1").await,
            Err(RetrievalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_kv_empty_content_is_an_error() {
        let content = KvContentStore::new(Store::new(Arc::new(MemoryStorage::new())));
        content.save("b1", Vec::new()).await.unwrap();
        assert!(matches!(
            content.load("b1").await,
            Err(RetrievalError::EmptyContent(_))
        ));
    }

    #[tokio::test]
    async fn test_local_shell_writes_epub_files() {
        let dir = TempDir::new().unwrap();
        let shell = LocalShell::new(dir.path(), 4321);
        shell.save_book_file("b1", b"bytes".to_vec()).await.unwrap();
        assert!(dir.path().join("b1.epub").exists());
        assert_eq!(shell.book_server_port().await.unwrap(), 4321);

        shell.delete_book_file("b1").await.unwrap();
        shell.delete_book_file("b1").await.unwrap();
        assert!(!dir.path().join("b1.epub").exists());
        assert!(shell.save_book_file("../x", Vec::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_shell_fetch_without_server_is_a_network_error() {
        let dir = TempDir::new().unwrap();
        // Port 9 (discard) is essentially never listening on loopback
        let shell = Arc::new(LocalShell::new(dir.path(), 9));
        let content = ShellContentStore::new(shell, Duration::from_secs(2));
        let err = content.load("b1").await.unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::Network(_) | RetrievalError::Timeout(_)
        ));
    }
}
