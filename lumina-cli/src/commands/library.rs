//! Library listing, editing and removal commands

use super::Options;
use anyhow::{anyhow, bail, Context, Result};
use lumina_core::library::{filter_by_collection, search, sort_records};
use lumina_core::{BookPatch, BookRecord, LuminaError, SortOrder};

/// List books, optionally filtered, searched and sorted
pub async fn list(
    opts: &Options,
    collection: Option<&str>,
    query: Option<&str>,
    sort: &str,
    json: bool,
) -> Result<()> {
    let order: SortOrder = sort.parse().map_err(|e: String| anyhow!(e))?;
    let workspace = super::open(opts).await?;
    let app = &workspace.app;

    let records = app.library.list().await;
    let mut books: Vec<&BookRecord> = match collection {
        Some(id) => {
            let collection = app
                .collections
                .get(id)
                .await
                .with_context(|| format!("Collection not found: {}", id))?;
            let membership = app.collections.membership().await;
            filter_by_collection(&collection, &membership, &records)
        }
        None => records.iter().collect(),
    };
    if let Some(q) = query {
        books = search(&books, q);
    }
    sort_records(&mut books, order);

    if json {
        println!("{}", serde_json::to_string_pretty(&books)?);
        return Ok(());
    }

    if books.is_empty() {
        println!("No books found");
        return Ok(());
    }
    for book in books {
        let marker = if book.favorite { "*" } else { " " };
        println!(
            "{} {}  {:>3}%  {} by {}",
            marker, book.id, book.progress, book.title, book.author
        );
    }
    Ok(())
}

/// Requested metadata changes for one book
#[derive(Default)]
pub struct EditArgs {
    pub title: Option<String>,
    pub author: Option<String>,
    pub favorite: Option<bool>,
    pub rating: Option<u8>,
    /// An empty genre clears it
    pub genre: Option<String>,
}

impl EditArgs {
    fn patch(self) -> BookPatch {
        BookPatch {
            title: self.title,
            author: self.author,
            favorite: self.favorite,
            rating: self.rating.map(Some),
            genre: self
                .genre
                .map(|genre| Some(genre.trim().to_string()).filter(|g| !g.is_empty())),
            ..BookPatch::default()
        }
    }
}

/// Change a book's title, author, rating, genre or favorite flag
pub async fn edit(opts: &Options, id: &str, args: EditArgs) -> Result<()> {
    let patch = args.patch();
    let workspace = super::open(opts).await?;

    let updated = workspace
        .app
        .library
        .merge(id, &patch)
        .await
        .map_err(LuminaError::from)?
        .ok_or_else(|| LuminaError::BookNotFound(id.to_string()))?;

    let marker = if updated.favorite { "*" } else { " " };
    println!("{} {}  {} by {}", marker, updated.id, updated.title, updated.author);
    Ok(())
}

/// Remove one book; both the record and the file are always attempted
pub async fn remove(opts: &Options, id: &str) -> Result<()> {
    let workspace = super::open(opts).await?;
    let report = workspace.app.remove_book(id).await;

    if let Err(e) = &report.content {
        eprintln!("Book file could not be deleted: {}", e);
    }
    let removed = report.into_result()?;
    if removed {
        println!("Removed {}", id);
    } else {
        println!("{} was not in the library", id);
    }
    Ok(())
}

/// Remove every book
pub async fn clear(opts: &Options, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to clear the library without --yes");
    }
    let workspace = super::open(opts).await?;
    let report = workspace.app.clear_library().await;

    println!("Removed {} books", report.removed);
    for (what, error) in &report.failures {
        eprintln!("  {}: {}", what, error);
    }
    if !report.failures.is_empty() {
        bail!("Clearing finished with {} failures", report.failures.len());
    }
    Ok(())
}
