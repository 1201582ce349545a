//! Lumina Core Library
//!
//! This crate provides the library, storage and book-loading pipeline of the
//! Lumina EPUB reader. Books are imported into a persistent library index,
//! their content is kept apart from their metadata, and the loader attaches
//! one book at a time to a rendering surface while the progress tracker
//! records where the reader is.

pub mod annotations;
pub mod app;
pub mod collections;
pub mod config;
pub mod content;
pub mod error;
pub mod events;
pub mod import;
pub mod library;
pub mod loader;
pub mod progress;
pub mod reader;
pub mod render;
pub mod settings;
pub mod storage;
pub mod types;

pub use app::{App, ClearReport, RemoveReport};
pub use config::Config;
pub use error::{
    LoadError, LuminaError, RenderError, Result, RetrievalError, StorageError, ValidationError,
};
pub use events::{AppEvent, EventBus};
pub use library::{Library, SortOrder};
pub use loader::{BookLoader, LoadRequest, LoadSource, LoadState, LoadedBook};
pub use progress::{percent_from_fraction, ProgressTracker};
pub use reader::{Key, NavAction, Panel, ReaderView};
pub use types::{
    BookPatch, BookRecord, Bookmark, Collection, Highlight, HighlightColor, ReadingSettings,
    SettingsChange, TocEntry,
};
