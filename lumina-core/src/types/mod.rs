//! Core data model shared by the library, loader and front ends

mod annotation;
mod book;
pub mod collection;
mod settings;
mod toc;

pub use annotation::{Bookmark, Highlight, HighlightColor};
pub use book::{BookPatch, BookRecord};
pub use collection::{builtin_collections, Collection, CollectionKind};
pub use settings::{FontFamily, FontSize, ReadingSettings, SettingsChange, Theme};
pub use toc::{flatten_toc, TocEntry};
