//! Collections: built-in smart queries and user-defined sets

use serde::{Deserialize, Serialize};

/// How a collection's membership is decided
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// Membership computed from book fields
    Smart,
    /// Membership stored explicitly
    Custom,
}

/// A named grouping of books
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Collection {
    pub id: String,
    pub name: String,
    /// Icon reference understood by the front end
    pub icon: String,
    #[serde(rename = "type")]
    pub kind: CollectionKind,
}

impl Collection {
    /// Create a custom collection
    pub fn custom(id: impl Into<String>, name: impl Into<String>, icon: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            icon: icon.into(),
            kind: CollectionKind::Custom,
        }
    }

    fn smart(id: &str, name: &str, icon: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            kind: CollectionKind::Smart,
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.kind == CollectionKind::Smart
    }
}

pub const ALL: &str = "all";
pub const READING: &str = "reading";
pub const FINISHED: &str = "finished";
pub const UNREAD: &str = "unread";
pub const FAVORITES: &str = "favorites";

/// The built-in smart collections, in display order
pub fn builtin_collections() -> Vec<Collection> {
    vec![
        Collection::smart(ALL, "All Books", "library"),
        Collection::smart(READING, "Reading", "book-open"),
        Collection::smart(FINISHED, "Finished", "check-circle"),
        Collection::smart(UNREAD, "Unread", "bookmark"),
        Collection::smart(FAVORITES, "Favorites", "heart"),
    ]
}

/// Whether `id` names a built-in collection
pub fn is_builtin_id(id: &str) -> bool {
    matches!(id, ALL | READING | FINISHED | UNREAD | FAVORITES)
}
