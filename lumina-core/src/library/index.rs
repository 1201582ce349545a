//! In-memory library index and the pure queries over it

use crate::types::collection::{ALL, FAVORITES, FINISHED, READING, UNREAD};
use crate::types::{BookPatch, BookRecord, Collection, CollectionKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Book id to the ids of the custom collections containing it
pub type Membership = BTreeMap<String, BTreeSet<String>>;

/// Ordered list of book records with unique ids
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LibraryIndex {
    books: Vec<BookRecord>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index, keeping the last record for any duplicated id
    ///
    /// Stored progress above 100 is clamped.
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        let mut index = Self::new();
        for mut record in records {
            record.progress = record.progress.min(100);
            index.upsert(record);
        }
        index
    }

    pub fn records(&self) -> &[BookRecord] {
        &self.books
    }

    pub fn len(&self) -> usize {
        self.books.len()
    }

    pub fn is_empty(&self) -> bool {
        self.books.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&BookRecord> {
        self.books.iter().find(|b| b.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Insert a record or replace the one with the same id, keeping its position
    pub fn upsert(&mut self, record: BookRecord) {
        match self.books.iter_mut().find(|b| b.id == record.id) {
            Some(existing) => *existing = record,
            None => self.books.push(record),
        }
    }

    /// Merge a partial update into an existing record
    pub fn merge(&mut self, id: &str, patch: &BookPatch) -> Option<&BookRecord> {
        let record = self.books.iter_mut().find(|b| b.id == id)?;
        record.apply(patch);
        Some(record)
    }

    pub fn remove(&mut self, id: &str) -> Option<BookRecord> {
        let pos = self.books.iter().position(|b| b.id == id)?;
        Some(self.books.remove(pos))
    }

    /// Drop every record, returning what was removed
    pub fn clear(&mut self) -> Vec<BookRecord> {
        std::mem::take(&mut self.books)
    }
}

/// Records belonging to a collection
///
/// Smart collections are predicates over the record itself; custom
/// collections look the book up in `membership`.
pub fn filter_by_collection<'a>(
    collection: &Collection,
    membership: &Membership,
    records: &'a [BookRecord],
) -> Vec<&'a BookRecord> {
    records
        .iter()
        .filter(|book| match collection.kind {
            CollectionKind::Smart => match collection.id.as_str() {
                ALL => true,
                READING => book.in_progress(),
                FINISHED => book.finished(),
                UNREAD => book.progress == 0,
                FAVORITES => book.favorite,
                _ => false,
            },
            CollectionKind::Custom => membership
                .get(&book.id)
                .is_some_and(|ids| ids.contains(&collection.id)),
        })
        .collect()
}

/// Case-insensitive search over title and author
pub fn search<'a>(records: &[&'a BookRecord], query: &str) -> Vec<&'a BookRecord> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return records.to_vec();
    }
    records
        .iter()
        .filter(|b| {
            b.title.to_lowercase().contains(&query) || b.author.to_lowercase().contains(&query)
        })
        .copied()
        .collect()
}

/// Library view ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Title,
    Author,
    /// Newest import first
    #[default]
    Recent,
    /// Most progress first
    Progress,
    /// Most recently opened first, never-opened last
    LastOpened,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "title" => Ok(SortOrder::Title),
            "author" => Ok(SortOrder::Author),
            "recent" | "added" => Ok(SortOrder::Recent),
            "progress" => Ok(SortOrder::Progress),
            "opened" | "last-opened" => Ok(SortOrder::LastOpened),
            other => Err(format!("unknown sort order: {}", other)),
        }
    }
}

/// Sort records in place; ties fall back to title
pub fn sort_records(records: &mut [&BookRecord], order: SortOrder) {
    let by_title = |a: &&BookRecord, b: &&BookRecord| a.title.to_lowercase().cmp(&b.title.to_lowercase());
    match order {
        SortOrder::Title => records.sort_by(by_title),
        SortOrder::Author => records.sort_by(|a, b| {
            a.author
                .to_lowercase()
                .cmp(&b.author.to_lowercase())
                .then_with(|| by_title(a, b))
        }),
        SortOrder::Recent => {
            records.sort_by(|a, b| b.added_at.cmp(&a.added_at).then_with(|| by_title(a, b)))
        }
        SortOrder::Progress => {
            records.sort_by(|a, b| b.progress.cmp(&a.progress).then_with(|| by_title(a, b)))
        }
        SortOrder::LastOpened => records.sort_by(|a, b| {
            b.last_opened
                .cmp(&a.last_opened)
                .then_with(|| by_title(a, b))
        }),
    }
}
