//! Library book records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A book in the library index
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookRecord {
    /// Unique identifier within the library
    pub id: String,

    pub title: String,

    pub author: String,

    /// Cover image as a `data:` URI
    #[serde(default)]
    pub cover: Option<String>,

    /// Last reading position marker
    #[serde(default)]
    pub cfi: Option<String>,

    /// Reading progress, 0..=100
    #[serde(default)]
    pub progress: u8,

    /// When the book was imported
    pub added_at: DateTime<Utc>,

    #[serde(default)]
    pub last_opened: Option<DateTime<Utc>>,

    /// User rating, 1..=5
    #[serde(default)]
    pub rating: Option<u8>,

    #[serde(default)]
    pub genre: Option<String>,

    #[serde(default)]
    pub favorite: bool,
}

impl BookRecord {
    /// Create a fresh record with no reading progress
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            author: author.into(),
            cover: None,
            cfi: None,
            progress: 0,
            added_at: Utc::now(),
            last_opened: None,
            rating: None,
            genre: None,
            favorite: false,
        }
    }

    /// Set the cover data URI
    pub fn with_cover(mut self, cover: Option<String>) -> Self {
        self.cover = cover;
        self
    }

    /// Apply a partial update
    pub fn apply(&mut self, patch: &BookPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(author) = &patch.author {
            self.author = author.clone();
        }
        if let Some(cover) = &patch.cover {
            self.cover = cover.clone();
        }
        if let Some(cfi) = &patch.cfi {
            self.cfi = Some(cfi.clone());
        }
        if let Some(progress) = patch.progress {
            self.progress = progress.min(100);
        }
        if let Some(last_opened) = patch.last_opened {
            self.last_opened = Some(last_opened);
        }
        if let Some(rating) = patch.rating {
            self.rating = rating.map(|r| r.clamp(1, 5));
        }
        if let Some(genre) = &patch.genre {
            self.genre = genre.clone();
        }
        if let Some(favorite) = patch.favorite {
            self.favorite = favorite;
        }
    }

    /// True while the book has been started but not finished
    pub fn in_progress(&self) -> bool {
        self.progress > 0 && self.progress < 100
    }

    pub fn finished(&self) -> bool {
        self.progress == 100
    }
}

/// Partial update of a [`BookRecord`]; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    /// `Some(None)` removes the cover
    pub cover: Option<Option<String>>,
    pub cfi: Option<String>,
    pub progress: Option<u8>,
    pub last_opened: Option<DateTime<Utc>>,
    /// `Some(None)` clears the rating
    pub rating: Option<Option<u8>>,
    pub genre: Option<Option<String>>,
    pub favorite: Option<bool>,
}

impl BookPatch {
    /// Patch carrying a new reading position
    pub fn position(cfi: impl Into<String>, progress: u8) -> Self {
        Self {
            cfi: Some(cfi.into()),
            progress: Some(progress),
            ..Self::default()
        }
    }
}
