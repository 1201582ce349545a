//! Application wiring
//!
//! [`App`] owns one instance of every service and implements the flows that
//! span several of them: import, removal, clearing the library and opening
//! a book onto the rendering surface.

use crate::annotations::Annotations;
use crate::collections::Collections;
use crate::config::Config;
use crate::content::{ContentStore, KvContentStore, ShellBridge, ShellContentStore};
use crate::error::{LuminaError, Result, StorageError};
use crate::events::{AppEvent, EventBus};
use crate::import::{new_book_id, validate_import};
use crate::library::Library;
use crate::loader::{BookLoader, LoadRequest, LoadedBook, LoaderTimeouts};
use crate::progress::ProgressTracker;
use crate::reader::{Key, NavAction, ReaderView};
use crate::render::{EpubEngine, Location, RenderEngine, RenderSurface, Rendition, SearchHit};
use crate::settings::SettingsStore;
use crate::storage::{keys, Runtime, StorageProvider, Store};
use crate::types::{BookPatch, BookRecord, Highlight, HighlightColor, ReadingSettings, SettingsChange};
use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Interval between rendering-surface readiness checks
pub const SURFACE_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Outcome of removing one book; both steps always run
#[derive(Debug)]
pub struct RemoveReport {
    pub book_id: String,
    /// Metadata removal; `Ok(false)` when the book was not in the index
    pub metadata: std::result::Result<bool, StorageError>,
    /// Content deletion
    pub content: std::result::Result<(), StorageError>,
}

impl RemoveReport {
    pub fn is_complete(&self) -> bool {
        self.metadata.is_ok() && self.content.is_ok()
    }

    /// First failure, if any
    pub fn into_result(self) -> Result<bool> {
        let removed = self.metadata?;
        self.content?;
        Ok(removed)
    }
}

/// Outcome of clearing the library
#[derive(Debug, Default)]
pub struct ClearReport {
    pub removed: usize,
    /// `(what, error)` for every step that failed
    pub failures: Vec<(String, String)>,
}

/// The reader application
pub struct App {
    pub config: Config,
    pub runtime: Runtime,
    pub store: Store,
    pub library: Library,
    pub content: Arc<dyn ContentStore>,
    pub collections: Collections,
    pub annotations: Annotations,
    pub settings: SettingsStore,
    pub engine: Arc<dyn RenderEngine>,
    pub surface: RenderSurface,
    pub tracker: ProgressTracker,
    pub loader: Arc<BookLoader>,
    pub events: EventBus,
    view: Mutex<ReaderView>,
}

impl App {
    /// Open the application for `config`
    ///
    /// With a shell bridge, storage is file based and book content goes
    /// through the shell. Without one, everything lives in the single-file
    /// store.
    pub async fn open(config: Config, shell: Option<Arc<dyn ShellBridge>>) -> Result<Self> {
        let runtime = Runtime::detect(shell.is_some());
        tokio::fs::create_dir_all(config.store_dir()).await?;
        let backend = runtime.open_storage(config.store_dir());
        let store = Store::new(backend.clone());
        let content: Arc<dyn ContentStore> = match shell {
            Some(bridge) => Arc::new(ShellContentStore::new(bridge, config.fetch_timeout)),
            None => Arc::new(KvContentStore::new(store.clone())),
        };
        Ok(Self::assemble(config, runtime, backend, content, Arc::new(EpubEngine::new())).await)
    }

    /// Wire the services over explicit parts
    pub async fn assemble(
        config: Config,
        runtime: Runtime,
        backend: Arc<dyn StorageProvider>,
        content: Arc<dyn ContentStore>,
        engine: Arc<dyn RenderEngine>,
    ) -> Self {
        let store = Store::new(backend);
        let events = EventBus::default();
        let library = Library::load(store.clone()).await;
        let collections = Collections::load(store.clone()).await;
        let annotations = Annotations::new(store.clone());
        let settings = SettingsStore::new(store.clone());
        let reading = settings.load().await;
        let surface = RenderSurface::new();
        let tracker = ProgressTracker::new(library.clone(), config.progress_debounce, events.clone());
        let loader = Arc::new(BookLoader::new(
            engine.clone(),
            content.clone(),
            surface.clone(),
            tracker.clone(),
            events.clone(),
            LoaderTimeouts {
                fetch: config.fetch_timeout,
                restore: config.restore_timeout,
            },
        ));

        tracing::info!(
            runtime = ?runtime,
            backend = store.backend().name(),
            books = library.len().await,
            "Application ready"
        );

        Self {
            config,
            runtime,
            store,
            library,
            content,
            collections,
            annotations,
            settings,
            engine,
            surface,
            tracker,
            loader,
            events,
            view: Mutex::new(ReaderView::new(reading)),
        }
    }

    /// Validate, inspect and store a new book
    pub async fn import_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<BookRecord> {
        validate_import(file_name, &bytes, self.config.max_file_size)?;
        let metadata = self.engine.inspect(&bytes).await?;

        let taken: HashSet<String> = self.library.list().await.into_iter().map(|b| b.id).collect();
        let id = new_book_id(|candidate| taken.contains(candidate));

        self.content.save(&id, bytes).await?;
        let record = BookRecord::new(&id, &metadata.title, &metadata.author).with_cover(metadata.cover);
        if let Err(e) = self.library.upsert(record.clone()).await {
            tracing::error!(book_id = %id, error = %e, "Failed to save book metadata, discarding content");
            if let Err(cleanup) = self.content.delete(&id).await {
                tracing::warn!(book_id = %id, error = %cleanup, "Failed to discard content");
            }
            // Storage never saw the record; drop it from memory too
            let _ = self.library.remove(&id).await;
            return Err(e.into());
        }

        tracing::info!(book_id = %id, title = %record.title, file_name, "Imported book");
        self.events.emit(AppEvent::BookImported {
            id: id.clone(),
            title: record.title.clone(),
        });
        Ok(record)
    }

    /// Remove a book's metadata, then its content
    pub async fn remove_book(&self, book_id: &str) -> RemoveReport {
        if self.loader.current_book().await.as_deref() == Some(book_id) {
            self.loader.close().await;
        }

        let metadata = self.library.remove(book_id).await.map(|r| r.is_some());
        if let Err(e) = &metadata {
            tracing::error!(book_id, error = %e, "Failed to remove book metadata");
        }
        let content = self.content.delete(book_id).await;
        if let Err(e) = &content {
            tracing::error!(book_id, error = %e, "Failed to delete book content");
        }

        if let Err(e) = self.collections.forget_book(book_id).await {
            tracing::warn!(book_id, error = %e, "Failed to drop collection membership");
        }
        if let Err(e) = self.annotations.forget_book(book_id).await {
            tracing::warn!(book_id, error = %e, "Failed to drop annotations");
        }

        if metadata.is_ok() {
            self.events.emit(AppEvent::BookRemoved {
                id: book_id.to_string(),
            });
        }
        RemoveReport {
            book_id: book_id.to_string(),
            metadata,
            content,
        }
    }

    /// Remove every book; failures are collected rather than aborting
    pub async fn clear_library(&self) -> ClearReport {
        self.loader.close().await;
        let known: Vec<String> = self.library.list().await.into_iter().map(|b| b.id).collect();
        let mut report = ClearReport {
            removed: known.len(),
            ..ClearReport::default()
        };

        if let Err(e) = self.library.clear().await {
            report.failures.push((keys::BOOKS.to_string(), e.to_string()));
        }
        for id in &known {
            if let Err(e) = self.content.delete(id).await {
                report.failures.push((keys::book_file(id), e.to_string()));
            }
            if let Err(e) = self.annotations.forget_book(id).await {
                report.failures.push((keys::bookmarks(id), e.to_string()));
            }
        }
        if let Err(e) = self.collections.forget_all().await {
            report.failures.push((keys::BOOK_COLLECTIONS.to_string(), e.to_string()));
        }

        if report.failures.is_empty() {
            tracing::info!(removed = report.removed, "Library cleared");
        } else {
            tracing::warn!(
                removed = report.removed,
                failures = report.failures.len(),
                "Library cleared with failures"
            );
        }
        self.events.emit(AppEvent::LibraryCleared {
            removed: report.removed,
        });
        report
    }

    /// Open a library book at its saved position
    pub async fn open_book(&self, book_id: &str) -> Result<LoadedBook> {
        let record = self
            .library
            .get(book_id)
            .await
            .ok_or_else(|| LuminaError::BookNotFound(book_id.to_string()))?;

        let loaded = self.load_onto_surface(LoadRequest::stored(book_id, record.cfi.clone())).await;
        let book = match loaded {
            Ok(book) => book,
            Err(e) => {
                if !matches!(e, LuminaError::Load(crate::error::LoadError::Busy)) {
                    self.events.emit(AppEvent::Error {
                        message: e.user_message(),
                    });
                }
                return Err(e);
            }
        };

        book.rendition.apply_settings(&self.view.lock().await.settings());
        for highlight in self.annotations.highlights(book_id).await {
            book.rendition.add_highlight(&highlight.cfi_range, highlight.color);
        }

        let opened = BookPatch {
            last_opened: Some(Utc::now()),
            ..BookPatch::default()
        };
        if let Err(e) = self.library.merge(book_id, &opened).await {
            tracing::warn!(book_id, error = %e, "Failed to record last opened time");
            self.events.emit(AppEvent::PersistFailed {
                key: keys::BOOKS.to_string(),
                message: e.to_string(),
            });
        }
        Ok(book)
    }

    async fn load_onto_surface(&self, request: LoadRequest) -> Result<LoadedBook> {
        self.surface
            .wait_ready(SURFACE_POLL_INTERVAL, self.config.surface_wait)
            .await?;
        Ok(self.loader.load(request).await?)
    }

    async fn rendition(&self) -> Result<Arc<dyn Rendition>> {
        self.loader.rendition().await.ok_or(LuminaError::NoOpenBook)
    }

    /// Turn a page or jump to the start
    pub async fn navigate(&self, action: NavAction) -> Result<Location> {
        let rendition = self.rendition().await?;
        let location = match action {
            NavAction::Prev => rendition.prev().await?,
            NavAction::Next => rendition.next().await?,
            NavAction::Start => rendition.display(None).await?,
        };
        Ok(location)
    }

    /// Jump to a position marker, e.g. a bookmark or table of contents entry
    pub async fn go_to(&self, cfi: &str) -> Result<Location> {
        let rendition = self.rendition().await?;
        Ok(rendition.display(Some(cfi)).await?)
    }

    /// Feed a key press through the reader view
    pub async fn handle_key(&self, key: Key) -> Result<Option<Location>> {
        let action = self.view.lock().await.handle_key(key);
        match action {
            Some(action) => self.navigate(action).await.map(Some),
            None => Ok(None),
        }
    }

    /// Search the open book
    pub async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let rendition = self.rendition().await?;
        Ok(rendition.search(query).await?)
    }

    /// Detach the open book, flushing its progress
    pub async fn close_book(&self) {
        self.loader.close().await;
    }

    pub async fn reading_settings(&self) -> ReadingSettings {
        self.view.lock().await.settings()
    }

    /// Change a reading setting, apply it to the open book and persist it
    pub async fn update_settings(&self, change: SettingsChange) -> Result<ReadingSettings> {
        let rendition = self.loader.rendition().await;
        let next = self
            .view
            .lock()
            .await
            .update_settings(change, rendition.as_deref())?;
        if let Err(e) = self.settings.save(&next).await {
            self.events.emit(AppEvent::PersistFailed {
                key: keys::READING_THEME.to_string(),
                message: e.to_string(),
            });
            return Err(e.into());
        }
        Ok(next)
    }

    /// Store a highlight and show it if its book is open
    pub async fn add_highlight(
        &self,
        book_id: &str,
        cfi_range: &str,
        text: &str,
        color: HighlightColor,
    ) -> Result<Highlight> {
        let highlight = self
            .annotations
            .add_highlight(book_id, Highlight::new(cfi_range, text, color))
            .await?;
        if self.loader.current_book().await.as_deref() == Some(book_id) {
            if let Some(rendition) = self.loader.rendition().await {
                rendition.add_highlight(cfi_range, color);
            }
        }
        Ok(highlight)
    }
}
