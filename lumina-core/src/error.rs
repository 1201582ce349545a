//! Error types for Lumina Core

use std::time::Duration;
use thiserror::Error;

/// Result type alias using LuminaError
pub type Result<T> = std::result::Result<T, LuminaError>;

/// Top-level error type for all Lumina operations
#[derive(Debug, Error)]
pub enum LuminaError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    #[error("Book not found: {0}")]
    BookNotFound(String),

    #[error("No book is open")]
    NoOpenBook,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LuminaError {
    /// Message suitable for showing to the user.
    ///
    /// Validation failures are already phrased for people and pass through.
    /// Everything else is categorized by matching known substrings of the
    /// error text, the same way retrieval failures are reported to readers.
    pub fn user_message(&self) -> String {
        match self {
            LuminaError::Validation(e) => e.to_string(),
            LuminaError::Load(LoadError::Busy) => {
                "A book is already loading, please wait".to_string()
            }
            other => categorize(&other.to_string()).message(&other.to_string()),
        }
    }
}

/// Coarse category used to pick a user-facing message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Timeout,
    Corrupt,
    NotFound,
    Server,
    Other,
}

impl ErrorCategory {
    fn message(self, raw: &str) -> String {
        match self {
            ErrorCategory::Timeout => {
                "Loading took too long. Please try opening the book again".to_string()
            }
            ErrorCategory::Corrupt => {
                "The book file appears to be corrupt or is not a valid EPUB".to_string()
            }
            ErrorCategory::NotFound => {
                "The book could not be found. Try importing it again".to_string()
            }
            ErrorCategory::Server => {
                "The local book server reported an error. Please try again".to_string()
            }
            ErrorCategory::Other => raw.to_string(),
        }
    }
}

/// Categorize an error message by known substrings
pub fn categorize(message: &str) -> ErrorCategory {
    let lower = message.to_lowercase();
    if lower.contains("timeout") || lower.contains("timed out") {
        ErrorCategory::Timeout
    } else if lower.contains("parse") || lower.contains("invalid") || lower.contains("corrupt") {
        ErrorCategory::Corrupt
    } else if lower.contains("fetch") || lower.contains("not found") {
        ErrorCategory::NotFound
    } else if lower.contains("server") {
        ErrorCategory::Server
    } else {
        ErrorCategory::Other
    }
}

/// Import validation failures, raised before any I/O
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type: {0}. Only .epub files can be imported")]
    UnsupportedExtension(String),

    #[error("The file is empty")]
    EmptyFile,

    #[error("The file is too large ({size} bytes, maximum is {max} bytes)")]
    TooLarge { size: u64, max: u64 },

    #[error("The file is not a valid EPUB archive")]
    InvalidSignature,
}

/// Failures while fetching stored book content
#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Book content not found: {0}")]
    NotFound(String),

    #[error("Book content is empty (corrupt file): {0}")]
    EmptyContent(String),

    #[error("Fetch timeout after {0:?}")]
    Timeout(Duration),

    #[error("Failed to fetch book content: {0}")]
    Network(String),

    #[error("Book server error: HTTP {0}")]
    Server(u16),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failures inside the rendering engine or on the rendering surface
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Rendering surface is not ready")]
    SurfaceNotReady,

    #[error("Rendering surface is owned by {0}")]
    SurfaceBusy(String),

    #[error("Failed to parse book: {0}")]
    Parse(String),

    #[error("Invalid position marker: {0}")]
    InvalidTarget(String),

    #[error("Display failed: {0}")]
    Display(String),

    #[error("Renderer timeout after {0:?}")]
    Timeout(Duration),

    #[error("Rendition has been destroyed")]
    Destroyed,
}

/// Errors that occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),

    #[error("Backend error: {0}")]
    BackendError(String),
}

/// Failures of a book load
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Another book is already loading")]
    Busy,

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Collection management failures
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Built-in collection cannot be modified: {0}")]
    BuiltIn(String),

    #[error("Collection not found: {0}")]
    NotFound(String),

    #[error("Collection name cannot be empty")]
    EmptyName,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Invalid reading settings
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("Font size {0}% is outside 60%..=200%")]
    FontSizeOutOfRange(u16),

    #[error("Unknown theme: {0}")]
    UnknownTheme(String),

    #[error("Unknown font family: {0}")]
    UnknownFont(String),
}
