//! Storage key names

/// List of book metadata records
pub const BOOKS: &str = "books";

/// Custom collection definitions
pub const COLLECTIONS: &str = "collections";

/// Book id to collection ids membership map
pub const BOOK_COLLECTIONS: &str = "bookCollections";

pub const READING_THEME: &str = "reading-theme";
pub const READING_FONT: &str = "reading-font";
pub const READING_FONT_SIZE: &str = "reading-font-size";

/// Prefix of keys holding binary book content
pub const BOOK_FILE_PREFIX: &str = "book_file_";

/// Binary content of a book (browser backend only)
pub fn book_file(book_id: &str) -> String {
    format!("{}{}", BOOK_FILE_PREFIX, book_id)
}

/// Whether `key` holds book content rather than small state
pub fn is_book_file(key: &str) -> bool {
    key.starts_with(BOOK_FILE_PREFIX)
}

/// Bookmarks owned by a book
pub fn bookmarks(book_id: &str) -> String {
    format!("bookmarks_{}", book_id)
}

/// Highlights owned by a book
pub fn highlights(book_id: &str) -> String {
    format!("highlights_{}", book_id)
}
