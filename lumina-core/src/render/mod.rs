//! Rendering engine seam
//!
//! Container parsing, spine navigation and position markers belong to the
//! rendering engine. The loader and progress tracker only talk to these
//! traits, so any engine that can open bytes onto a [`RenderSurface`] and
//! report location changes can drive them.

mod epub;
mod surface;

pub use self::epub::{spine_cfi, EpubEngine};
pub use surface::{RenderSurface, SurfaceHandle};

use crate::error::RenderError;
use crate::types::{HighlightColor, ReadingSettings, TocEntry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Descriptive metadata read from a book
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookMetadata {
    pub title: String,
    pub author: String,
    pub language: Option<String>,
    /// Cover as a `data:` URI
    pub cover: Option<String>,
}

/// A position reported by a rendition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Opaque position marker
    pub cfi: String,
    /// Document currently shown
    pub href: String,
}

/// A content search match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub cfi: String,
    pub excerpt: String,
}

/// Factory for renditions, i.e. the external rendering library
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Read metadata without attaching anything
    async fn inspect(&self, content: &[u8]) -> Result<BookMetadata, RenderError>;

    /// Parse `content` and attach a rendition to `surface`
    async fn open(
        &self,
        content: Vec<u8>,
        surface: &SurfaceHandle,
    ) -> Result<Arc<dyn Rendition>, RenderError>;
}

/// A book attached to a rendering surface
///
/// `display` may be dropped mid-flight when a caller's timeout fires, so
/// implementations must leave the rendition usable if that happens.
#[async_trait]
pub trait Rendition: Send + Sync {
    fn metadata(&self) -> BookMetadata;

    fn toc(&self) -> Vec<TocEntry>;

    /// Show the given marker, or the start of the book when `None`
    async fn display(&self, target: Option<&str>) -> Result<Location, RenderError>;

    async fn next(&self) -> Result<Location, RenderError>;

    async fn prev(&self) -> Result<Location, RenderError>;

    /// Last displayed location
    fn current(&self) -> Option<Location>;

    /// Fraction of the book before `cfi`, in 0.0..=1.0
    fn percentage_from_cfi(&self, cfi: &str) -> Option<f64>;

    /// Stream of location changes
    fn subscribe(&self) -> broadcast::Receiver<Location>;

    fn apply_settings(&self, settings: &ReadingSettings);

    fn add_highlight(&self, cfi_range: &str, color: HighlightColor);

    fn clear_annotations(&self);

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RenderError>;

    /// Release everything held by the rendition; later calls fail
    fn destroy(&self);
}
