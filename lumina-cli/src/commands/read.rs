//! Reader commands: open a book, turn pages, search

use super::{Options, Workspace};
use anyhow::{bail, Result};
use lumina_core::render::Location;
use lumina_core::types::flatten_toc;
use lumina_core::{percent_from_fraction, Key, LoadedBook};

/// Open a book at its saved position and optionally move around in it
pub async fn read(
    opts: &Options,
    id: &str,
    keys: Option<&str>,
    goto: Option<&str>,
    toc: bool,
) -> Result<()> {
    let keys = match keys {
        Some(keys) => parse_keys(keys)?,
        None => Vec::new(),
    };

    let workspace = super::open(opts).await?;
    let book = open_mounted(&workspace, id).await?;
    let app = &workspace.app;

    println!("{} by {}", book.metadata.title, book.metadata.author);
    if !book.restored {
        println!("Saved position unavailable, starting from the beginning");
    }
    if toc {
        for entry in flatten_toc(&book.toc) {
            println!("{}{}  ({})", "  ".repeat(entry.level as usize), entry.title, entry.href);
        }
    }

    let mut location = book.location.clone();
    if let Some(cfi) = goto {
        location = app.go_to(cfi).await?;
    }
    for key in keys {
        if let Some(next) = app.handle_key(key).await? {
            location = next;
        }
    }

    let progress = book
        .rendition
        .percentage_from_cfi(&location.cfi)
        .map(percent_from_fraction)
        .unwrap_or(0);
    print_location(&location, progress);

    app.close_book().await;
    Ok(())
}

/// Search the text of a book
pub async fn search(opts: &Options, id: &str, query: &str) -> Result<()> {
    let workspace = super::open(opts).await?;
    open_mounted(&workspace, id).await?;

    let hits = workspace.app.search(query).await;
    workspace.app.close_book().await;
    let hits = hits?;

    if hits.is_empty() {
        println!("No matches for \"{}\"", query);
    }
    for hit in hits {
        println!("{}  {}", hit.cfi, hit.excerpt);
    }
    Ok(())
}

async fn open_mounted(workspace: &Workspace, id: &str) -> Result<LoadedBook> {
    workspace.app.surface.mount();
    Ok(workspace.app.open_book(id).await?)
}

fn print_location(location: &Location, progress: u8) {
    println!("Location: {}", location.cfi);
    println!("Document: {}", location.href);
    println!("Progress: {}%", progress);
}

fn parse_keys(input: &str) -> Result<Vec<Key>> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(parse_key)
        .collect()
}

fn parse_key(name: &str) -> Result<Key> {
    let key = match name.to_lowercase().as_str() {
        "left" | "prev" => Key::Left,
        "right" | "next" => Key::Right,
        "pageup" => Key::PageUp,
        "pagedown" => Key::PageDown,
        "space" => Key::Space,
        "home" => Key::Home,
        "escape" | "esc" => Key::Escape,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Key::Char(c),
                _ => bail!("Unknown key: {}", name),
            }
        }
    };
    Ok(key)
}
