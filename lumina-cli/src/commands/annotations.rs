//! Bookmark and highlight commands

use super::Options;
use anyhow::{anyhow, bail, Result};
use clap::Subcommand;
use lumina_core::{Bookmark, HighlightColor, LuminaError};

#[derive(Subcommand)]
pub enum BookmarkCommand {
    /// List a book's bookmarks
    List {
        /// Book id
        book: String,
    },

    /// Bookmark a position
    Add {
        /// Book id
        book: String,

        /// Position marker
        cfi: String,

        /// Label shown in the bookmarks panel
        #[arg(short, long, default_value = "")]
        label: String,
    },

    /// Delete a bookmark
    Remove {
        /// Book id
        book: String,

        /// Bookmark id
        id: String,
    },
}

#[derive(Subcommand)]
pub enum HighlightCommand {
    /// List a book's highlights
    List {
        /// Book id
        book: String,
    },

    /// Highlight a range of text
    Add {
        /// Book id
        book: String,

        /// Range marker
        cfi_range: String,

        /// Highlighted text
        text: String,

        /// Color (yellow, green, blue, pink)
        #[arg(short, long, default_value = "yellow")]
        color: String,
    },

    /// Delete a highlight
    Remove {
        /// Book id
        book: String,

        /// Highlight id
        id: String,
    },
}

/// Run a bookmark command
pub async fn bookmarks(opts: &Options, command: BookmarkCommand) -> Result<()> {
    let workspace = super::open(opts).await?;
    let app = &workspace.app;

    match command {
        BookmarkCommand::List { book } => {
            for bookmark in app.annotations.bookmarks(&book).await {
                println!("{}  {}  {}", bookmark.id, bookmark.cfi, bookmark.label);
            }
        }
        BookmarkCommand::Add { book, cfi, label } => {
            ensure_book(app, &book).await?;
            let bookmark = app
                .annotations
                .add_bookmark(&book, Bookmark::new(cfi, label))
                .await?;
            println!("{}", bookmark.id);
        }
        BookmarkCommand::Remove { book, id } => {
            if !app.annotations.remove_bookmark(&book, &id).await? {
                bail!("Bookmark not found: {}", id);
            }
            println!("Removed bookmark {}", id);
        }
    }
    Ok(())
}

/// Run a highlight command
pub async fn highlights(opts: &Options, command: HighlightCommand) -> Result<()> {
    let workspace = super::open(opts).await?;
    let app = &workspace.app;

    match command {
        HighlightCommand::List { book } => {
            for highlight in app.annotations.highlights(&book).await {
                println!(
                    "{}  {:<6}  {}  \"{}\"",
                    highlight.id,
                    highlight.color.as_str(),
                    highlight.cfi_range,
                    highlight.text
                );
            }
        }
        HighlightCommand::Add {
            book,
            cfi_range,
            text,
            color,
        } => {
            let color: HighlightColor = color.parse().map_err(|e: String| anyhow!(e))?;
            ensure_book(app, &book).await?;
            let highlight = app.add_highlight(&book, &cfi_range, &text, color).await?;
            println!("{}", highlight.id);
        }
        HighlightCommand::Remove { book, id } => {
            if !app.annotations.remove_highlight(&book, &id).await? {
                bail!("Highlight not found: {}", id);
            }
            println!("Removed highlight {}", id);
        }
    }
    Ok(())
}

async fn ensure_book(app: &lumina_core::App, book_id: &str) -> Result<()> {
    if !app.library.contains(book_id).await {
        return Err(LuminaError::BookNotFound(book_id.to_string()).into());
    }
    Ok(())
}
