//! Collection commands

use super::Options;
use anyhow::{Context, Result};
use clap::Subcommand;
use lumina_core::library::filter_by_collection;

#[derive(Subcommand)]
pub enum CollectionCommand {
    /// List built-in and custom collections
    List,

    /// List the books in a collection
    Show { id: String },

    /// Create a custom collection
    Create {
        name: String,

        /// Icon name
        #[arg(long)]
        icon: Option<String>,
    },

    /// Rename a custom collection
    Rename { id: String, name: String },

    /// Delete a custom collection
    Delete { id: String },

    /// Put a book into a custom collection
    Add { collection: String, book: String },

    /// Take a book out of a custom collection
    Remove { collection: String, book: String },
}

/// Run a collection command
pub async fn collections(opts: &Options, command: CollectionCommand) -> Result<()> {
    let workspace = super::open(opts).await?;
    let collections = &workspace.app.collections;

    match command {
        CollectionCommand::List => {
            let membership = collections.membership().await;
            for collection in collections.list().await {
                let count = membership.get(&collection.id).map(|books| books.len());
                match count {
                    Some(n) if !collection.is_builtin() => {
                        println!("{:<12} {} ({} books)", collection.id, collection.name, n)
                    }
                    _ => println!("{:<12} {}", collection.id, collection.name),
                }
            }
        }
        CollectionCommand::Show { id } => {
            let collection = collections
                .get(&id)
                .await
                .with_context(|| format!("Collection not found: {}", id))?;
            let membership = collections.membership().await;
            let records = workspace.app.library.list().await;
            let books = filter_by_collection(&collection, &membership, &records);
            if books.is_empty() {
                println!("{} is empty", collection.name);
            }
            for book in books {
                println!("{}  {} by {}", book.id, book.title, book.author);
            }
        }
        CollectionCommand::Create { name, icon } => {
            let collection = collections.create(&name, icon.as_deref()).await?;
            println!("{}", collection.id);
        }
        CollectionCommand::Rename { id, name } => {
            collections.rename(&id, &name).await?;
            println!("Renamed {} to {}", id, name);
        }
        CollectionCommand::Delete { id } => {
            collections.delete(&id).await?;
            println!("Deleted {}", id);
        }
        CollectionCommand::Add { collection, book } => {
            if !workspace.app.library.contains(&book).await {
                return Err(lumina_core::LuminaError::BookNotFound(book).into());
            }
            collections.add_book(&collection, &book).await?;
            println!("Added {} to {}", book, collection);
        }
        CollectionCommand::Remove { collection, book } => {
            collections.remove_book(&collection, &book).await?;
            println!("Removed {} from {}", book, collection);
        }
    }
    Ok(())
}
