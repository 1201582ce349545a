//! Bookmarks and highlights

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A saved location inside one book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Bookmark {
    pub id: String,
    pub cfi: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl Bookmark {
    pub fn new(cfi: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cfi: cfi.into(),
            label: label.into(),
            created_at: Utc::now(),
        }
    }
}

/// Highlight color tag
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HighlightColor {
    #[default]
    Yellow,
    Green,
    Blue,
    Pink,
}

impl HighlightColor {
    pub fn as_str(self) -> &'static str {
        match self {
            HighlightColor::Yellow => "yellow",
            HighlightColor::Green => "green",
            HighlightColor::Blue => "blue",
            HighlightColor::Pink => "pink",
        }
    }
}

impl fmt::Display for HighlightColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HighlightColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yellow" => Ok(HighlightColor::Yellow),
            "green" => Ok(HighlightColor::Green),
            "blue" => Ok(HighlightColor::Blue),
            "pink" => Ok(HighlightColor::Pink),
            other => Err(format!("unknown highlight color: {}", other)),
        }
    }
}

/// A highlighted passage inside one book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Highlight {
    pub id: String,
    /// Position range marker covering the passage
    pub cfi_range: String,
    /// Captured text
    pub text: String,
    pub color: HighlightColor,
    pub created_at: DateTime<Utc>,
}

impl Highlight {
    pub fn new(cfi_range: impl Into<String>, text: impl Into<String>, color: HighlightColor) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            cfi_range: cfi_range.into(),
            text: text.into(),
            color,
            created_at: Utc::now(),
        }
    }
}
