//! The single rendering surface books are attached to

use crate::error::RenderError;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug)]
struct Inner {
    mounted: watch::Sender<bool>,
    owner: Mutex<Option<String>>,
}

/// Attachment point for a rendition
///
/// The front end mounts the surface when its view exists. At most one book
/// owns the surface at a time; the loader's cleanup step is the only place
/// that releases it.
#[derive(Debug, Clone)]
pub struct RenderSurface {
    inner: Arc<Inner>,
}

/// Proof of exclusive ownership handed to the engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceHandle {
    owner: String,
}

impl SurfaceHandle {
    pub fn owner(&self) -> &str {
        &self.owner
    }
}

impl Default for RenderSurface {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderSurface {
    pub fn new() -> Self {
        let (mounted, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                mounted,
                owner: Mutex::new(None),
            }),
        }
    }

    /// Mark the surface as present
    pub fn mount(&self) {
        self.inner.mounted.send_replace(true);
    }

    /// Mark the surface as gone
    pub fn unmount(&self) {
        self.inner.mounted.send_replace(false);
    }

    pub fn is_mounted(&self) -> bool {
        *self.inner.mounted.borrow()
    }

    /// Poll for the surface every `interval` until it is mounted or `limit` passes
    pub async fn wait_ready(&self, interval: Duration, limit: Duration) -> Result<(), RenderError> {
        let deadline = tokio::time::Instant::now() + limit;
        let mut attempts = 0u32;
        loop {
            if self.is_mounted() {
                tracing::debug!(attempts, "Rendering surface ready");
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(attempts, "Rendering surface never became ready");
                return Err(RenderError::SurfaceNotReady);
            }
            attempts += 1;
            tokio::time::sleep(interval).await;
        }
    }

    /// Take exclusive ownership for `owner`
    pub fn claim(&self, owner: &str) -> Result<SurfaceHandle, RenderError> {
        if !self.is_mounted() {
            return Err(RenderError::SurfaceNotReady);
        }
        let mut current = self.lock_owner();
        match current.as_deref() {
            Some(existing) => Err(RenderError::SurfaceBusy(existing.to_string())),
            None => {
                *current = Some(owner.to_string());
                Ok(SurfaceHandle {
                    owner: owner.to_string(),
                })
            }
        }
    }

    /// Give up ownership; releasing a free surface is a no-op
    pub fn release(&self) -> Option<String> {
        self.lock_owner().take()
    }

    pub fn owner(&self) -> Option<String> {
        self.lock_owner().clone()
    }

    fn lock_owner(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.inner
            .owner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
