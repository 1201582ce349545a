//! Typed access to a storage provider with the read/write failure policy
//!
//! Reads never fail: a backend error or an undecodable value is logged and
//! treated as a cache miss. Writes surface their error to the caller.

use super::{StorageProvider, StorageResult};
use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Cloneable handle over the active storage backend
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn StorageProvider>,
}

impl Store {
    pub fn new(backend: Arc<dyn StorageProvider>) -> Self {
        Self { backend }
    }

    /// Underlying provider
    pub fn backend(&self) -> &Arc<dyn StorageProvider> {
        &self.backend
    }

    /// Read raw bytes; failures are reported as absent
    pub async fn get_bytes(&self, key: &str) -> Option<Vec<u8>> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, backend = self.backend.name(), "Storage read failed: {}", e);
                None
            }
        }
    }

    /// Read and decode a JSON value; failures are reported as absent
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let bytes = self.get_bytes(key).await?;
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, "Stored value could not be decoded: {}", e);
                None
            }
        }
    }

    /// Write raw bytes
    pub async fn set_bytes(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        self.backend.set(key, value).await
    }

    /// Encode and write a JSON value
    pub async fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> StorageResult<()> {
        let data =
            serde_json::to_vec(value).map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.backend.set(key, data).await
    }

    /// Remove a key
    pub async fn remove(&self, key: &str) -> StorageResult<()> {
        self.backend.remove(key).await
    }

    /// Remove every key
    pub async fn clear(&self) -> StorageResult<()> {
        self.backend.clear().await
    }
}
