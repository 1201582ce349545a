//! Application notifications
//!
//! Everything the user should be told about asynchronously (rejected loads,
//! failed writes) is broadcast here. Front ends render them as toasts.

use tokio::sync::broadcast;

/// Notification broadcast to every subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// A book was imported into the library
    BookImported { id: String, title: String },

    /// A book was removed from the library
    BookRemoved { id: String },

    /// The whole library was cleared
    LibraryCleared { removed: usize },

    /// A load request was dropped because another load is in flight
    LoadRejected { requested: String },

    /// A write to storage failed; memory and storage may now disagree
    PersistFailed { key: String, message: String },

    /// Any other error worth surfacing
    Error { message: String },
}

/// Broadcast channel for [`AppEvent`]s
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.tx.subscribe()
    }

    /// Broadcast an event
    pub fn emit(&self, event: AppEvent) {
        // Ignore errors (no subscribers)
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
