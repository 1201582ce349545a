//! Key-value storage adapter
//!
//! Every persisted piece of state goes through [`StorageProvider`]. Two
//! interchangeable persistent backends exist: [`FileStorage`] (desktop, one
//! file per key) and [`DatabaseStorage`] (single JSON document, the browser
//! store analogue). [`Runtime::detect`] picks one at startup.

mod database;
pub mod keys;
mod store;

pub use database::DatabaseStorage;
pub use store::Store;

use crate::error::StorageError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Abstract key-value storage provider
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Read the value stored under `key`, `None` when absent
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>>;

    /// Store `value` under `key`, replacing any previous value
    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()>;

    /// Remove `key`; removing an absent key succeeds
    async fn remove(&self, key: &str) -> StorageResult<()>;

    /// Remove every key
    async fn clear(&self) -> StorageResult<()>;

    /// List all keys
    async fn keys(&self) -> StorageResult<Vec<String>>;

    /// Short backend name for logs
    fn name(&self) -> &'static str;
}

/// Which persistent backend serves this process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Runtime {
    /// A desktop shell bridge is available
    Desktop,
    /// No shell; behave like the browser build
    Browser,
}

impl Runtime {
    /// Detect the runtime from the presence of a shell bridge
    pub fn detect(shell_present: bool) -> Self {
        if shell_present {
            Runtime::Desktop
        } else {
            Runtime::Browser
        }
    }

    /// Open the storage backend matching this runtime under `root`
    pub fn open_storage(self, root: impl AsRef<Path>) -> Arc<dyn StorageProvider> {
        let root = root.as_ref();
        let storage: Arc<dyn StorageProvider> = match self {
            Runtime::Desktop => Arc::new(FileStorage::new(root)),
            Runtime::Browser => Arc::new(DatabaseStorage::new(root.join("lumina.db.json"))),
        };
        tracing::debug!(backend = storage.name(), root = %root.display(), "Opened storage");
        storage
    }
}

/// Reject keys that could escape the storage root
pub(crate) fn validate_key(key: &str) -> StorageResult<()> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}

/// Desktop-native storage: one file per key under a root directory
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    /// Create a new file storage rooted at the given directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn full_path(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl StorageProvider for FileStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let full_path = self.full_path(key)?;
        match tokio::fs::read(full_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let full_path = self.full_path(key)?;
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        // Write to a sibling temp file then rename so readers never see a partial value
        let temp_path = self.root.join(format!(".{}.tmp", key));
        tokio::fs::write(&temp_path, value)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(e.to_string()),
                _ => StorageError::BackendError(e.to_string()),
            })?;
        tokio::fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let full_path = self.full_path(key)?;
        match tokio::fs::remove_file(full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn clear(&self) -> StorageResult<()> {
        for key in self.keys().await? {
            self.remove(&key).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut read_dir = match tokio::fs::read_dir(&self.root).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::BackendError(e.to_string())),
        };

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?
        {
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    entries.push(name.to_string());
                }
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// In-memory storage provider (for testing and dry runs)
#[derive(Default)]
pub struct MemoryStorage {
    data: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_map(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_map(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Vec<u8>>> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StorageProvider for MemoryStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.read_map().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        validate_key(key)?;
        self.write_map().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.write_map().remove(key);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        self.write_map().clear();
        Ok(())
    }

    async fn keys(&self) -> StorageResult<Vec<String>> {
        let mut keys: Vec<String> = self.read_map().keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
