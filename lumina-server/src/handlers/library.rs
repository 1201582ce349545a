//! Library browsing handlers

use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use lumina_core::library::{filter_by_collection, search, sort_records};
use lumina_core::{BookRecord, Collection, SortOrder};
use serde::{Deserialize, Serialize};

/// Query parameters for listing books
#[derive(Debug, Deserialize)]
pub struct ListBooksQuery {
    /// Page number (1-indexed, 0 treated as 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Search query over title and author
    pub search: Option<String>,

    /// Collection id to filter by
    pub collection: Option<String>,

    /// Sort order (title, author, recent, progress, opened)
    pub sort: Option<String>,
}

fn default_page() -> u32 {
    1
}
fn default_per_page() -> u32 {
    20
}

/// Sanitize page number (treat 0 as 1 to prevent underflow)
fn sanitize_page(page: u32) -> u32 {
    page.max(1)
}

/// Book summary for list response
#[derive(Debug, Serialize)]
pub struct BookSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub progress: u8,
    pub favorite: bool,
}

impl From<&BookRecord> for BookSummary {
    fn from(record: &BookRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            author: record.author.clone(),
            progress: record.progress,
            favorite: record.favorite,
        }
    }
}

/// List response with pagination
#[derive(Debug, Serialize)]
pub struct ListBooksResponse {
    pub books: Vec<BookSummary>,
    pub total: u32,
    pub page: u32,
    pub per_page: u32,
}

/// List books, optionally filtered, searched and sorted
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<ListBooksQuery>,
) -> Result<Json<ListBooksResponse>, (StatusCode, String)> {
    let order = match query.sort.as_deref() {
        Some(sort) => sort
            .parse::<SortOrder>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e))?,
        None => SortOrder::default(),
    };

    let records = state.library.list().await;
    let mut books: Vec<&BookRecord> = match query.collection.as_deref() {
        Some(id) => {
            let collection = state.collections.get(id).await.ok_or_else(|| {
                (StatusCode::NOT_FOUND, format!("Collection not found: {}", id))
            })?;
            let membership = state.collections.membership().await;
            filter_by_collection(&collection, &membership, &records)
        }
        None => records.iter().collect(),
    };
    if let Some(ref q) = query.search {
        books = search(&books, q);
    }
    sort_records(&mut books, order);

    let total = books.len() as u32;

    // Paginate (sanitize page to prevent underflow)
    let page = sanitize_page(query.page);
    let start = ((page - 1) * query.per_page) as usize;
    let books: Vec<BookSummary> = books
        .into_iter()
        .skip(start)
        .take(query.per_page as usize)
        .map(BookSummary::from)
        .collect();

    Ok(Json(ListBooksResponse {
        books,
        total,
        page,
        per_page: query.per_page,
    }))
}

/// Book detail response
#[derive(Debug, Serialize)]
pub struct BookResponse {
    #[serde(flatten)]
    pub record: BookRecord,
    pub collections: Vec<String>,
}

/// Get a single book's metadata
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<BookResponse>, StatusCode> {
    let record = state.library.get(&id).await.ok_or(StatusCode::NOT_FOUND)?;
    let collections = state.collections.collections_of(&id).await;
    Ok(Json(BookResponse {
        record,
        collections,
    }))
}

/// List built-in and custom collections
pub async fn list_collections(State(state): State<AppState>) -> Json<Vec<Collection>> {
    Json(state.collections.list().await)
}
