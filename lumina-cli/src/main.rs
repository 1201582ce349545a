//! Lumina CLI - Command-line front end for the Lumina library and reader

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use lumina_core::LuminaError;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lumina")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory (overrides LUMINA_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Run as the desktop shell: book files go through the loopback book server
    #[arg(long, global = true)]
    desktop: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import one or more EPUB files into the library
    Import {
        /// Files to import
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List books in the library
    List {
        /// Only books in this collection
        #[arg(short, long)]
        collection: Option<String>,

        /// Filter by title or author
        #[arg(short, long)]
        search: Option<String>,

        /// Sort order (title, author, recent, progress, opened)
        #[arg(long, default_value = "recent")]
        sort: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a book's details
    Edit {
        /// Book id
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        author: Option<String>,

        /// Mark as favorite
        #[arg(long, conflicts_with = "no_favorite")]
        favorite: bool,

        /// Unmark as favorite
        #[arg(long)]
        no_favorite: bool,

        /// Rating from 1 to 5
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=5))]
        rating: Option<u8>,

        /// Genre (empty to clear)
        #[arg(long)]
        genre: Option<String>,
    },

    /// Remove a book and its stored file
    Remove {
        /// Book id
        id: String,
    },

    /// Remove every book from the library
    Clear {
        /// Confirm clearing the library
        #[arg(long)]
        yes: bool,
    },

    /// Open a book, optionally turn pages, and report the position
    Read {
        /// Book id
        id: String,

        /// Keys to press, e.g. "right right left" (right, left, pageup, pagedown, space, home)
        #[arg(short, long)]
        keys: Option<String>,

        /// Jump to a position marker before pressing keys
        #[arg(long)]
        goto: Option<String>,

        /// Print the table of contents
        #[arg(long)]
        toc: bool,
    },

    /// Search the text of a book
    Search {
        /// Book id
        id: String,

        /// Text to find
        query: String,
    },

    /// Manage bookmarks
    #[command(subcommand)]
    Bookmarks(commands::BookmarkCommand),

    /// Manage highlights
    #[command(subcommand)]
    Highlights(commands::HighlightCommand),

    /// Manage collections
    #[command(subcommand)]
    Collections(commands::CollectionCommand),

    /// Show or change reading settings
    Settings {
        /// Theme (light, sepia, dark)
        #[arg(long)]
        theme: Option<String>,

        /// Font family (serif, sans, mono, dyslexic)
        #[arg(long)]
        font: Option<String>,

        /// Font size in percent
        #[arg(long, conflicts_with_all = ["larger", "smaller"])]
        size: Option<u16>,

        /// One step larger
        #[arg(long, conflicts_with = "smaller")]
        larger: bool,

        /// One step smaller
        #[arg(long)]
        smaller: bool,

        /// Print the stylesheet injected into rendered pages
        #[arg(long)]
        css: bool,
    },

    /// Run the book server in the foreground
    Serve {
        /// Port to listen on (0 picks a free port)
        #[arg(short, long, default_value = "0")]
        port: u16,
    },
}

async fn run(cli: Cli) -> Result<()> {
    let opts = commands::Options {
        data_dir: cli.data_dir,
        desktop: cli.desktop,
    };

    match cli.command {
        Commands::Import { files, json } => commands::import(&opts, &files, json).await,

        Commands::List {
            collection,
            search,
            sort,
            json,
        } => commands::list(&opts, collection.as_deref(), search.as_deref(), &sort, json).await,

        Commands::Edit {
            id,
            title,
            author,
            favorite,
            no_favorite,
            rating,
            genre,
        } => {
            let args = commands::EditArgs {
                title,
                author,
                favorite: match (favorite, no_favorite) {
                    (true, _) => Some(true),
                    (_, true) => Some(false),
                    _ => None,
                },
                rating,
                genre,
            };
            commands::edit(&opts, &id, args).await
        }

        Commands::Remove { id } => commands::remove(&opts, &id).await,

        Commands::Clear { yes } => commands::clear(&opts, yes).await,

        Commands::Read {
            id,
            keys,
            goto,
            toc,
        } => commands::read(&opts, &id, keys.as_deref(), goto.as_deref(), toc).await,

        Commands::Search { id, query } => commands::search(&opts, &id, &query).await,

        Commands::Bookmarks(command) => commands::bookmarks(&opts, command).await,

        Commands::Highlights(command) => commands::highlights(&opts, command).await,

        Commands::Collections(command) => commands::collections(&opts, command).await,

        Commands::Settings {
            theme,
            font,
            size,
            larger,
            smaller,
            css,
        } => {
            let change = commands::SettingsArgs {
                theme,
                font,
                size,
                larger,
                smaller,
            };
            commands::settings(&opts, change, css).await
        }

        Commands::Serve { port } => commands::serve(&opts, port).await,
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose {
        "lumina_cli=debug,lumina_core=debug,lumina_server=debug"
    } else {
        "lumina_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<LuminaError>() {
            Some(err) => eprintln!("Error: {}", err.user_message()),
            None => eprintln!("Error: {:#}", e),
        }
        std::process::exit(1);
    }
}
