//! Book loading state machine
//!
//! A load runs `Cleanup → Fetching → InitializingRenderer →
//! RestoringPosition → Ready`, or stops in `Error`. Only one load runs at a
//! time; a request arriving meanwhile is rejected, never queued.

use crate::content::ContentStore;
use crate::error::{LoadError, RenderError, RetrievalError};
use crate::events::{AppEvent, EventBus};
use crate::progress::{ProgressTracker, Session, Subscription};
use crate::render::{BookMetadata, Location, RenderEngine, RenderSurface, Rendition};
use crate::types::TocEntry;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};

/// Observable phase of the loader
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Cleanup,
    Fetching,
    InitializingRenderer,
    RestoringPosition,
    Ready,
    Error(String),
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadState::Idle => write!(f, "idle"),
            LoadState::Cleanup => write!(f, "cleanup"),
            LoadState::Fetching => write!(f, "fetching"),
            LoadState::InitializingRenderer => write!(f, "initializing-renderer"),
            LoadState::RestoringPosition => write!(f, "restoring-position"),
            LoadState::Ready => write!(f, "ready"),
            LoadState::Error(message) => write!(f, "error: {}", message),
        }
    }
}

/// Where the book bytes come from
#[derive(Debug, Clone)]
pub enum LoadSource {
    /// Bytes already in hand, e.g. a file just picked by the user
    Bytes { book_id: String, content: Vec<u8> },
    /// Content kept by the content store
    Stored { book_id: String },
}

impl LoadSource {
    pub fn book_id(&self) -> &str {
        match self {
            LoadSource::Bytes { book_id, .. } | LoadSource::Stored { book_id } => book_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub source: LoadSource,
    /// Position to restore, if any
    pub saved_cfi: Option<String>,
}

impl LoadRequest {
    pub fn stored(book_id: impl Into<String>, saved_cfi: Option<String>) -> Self {
        Self {
            source: LoadSource::Stored {
                book_id: book_id.into(),
            },
            saved_cfi,
        }
    }
}

/// A book attached and showing its first location
#[derive(Clone)]
pub struct LoadedBook {
    pub book_id: String,
    pub metadata: BookMetadata,
    pub toc: Vec<TocEntry>,
    pub rendition: Arc<dyn Rendition>,
    pub location: Location,
    /// False when the saved position could not be shown
    pub restored: bool,
}

impl fmt::Debug for LoadedBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedBook")
            .field("book_id", &self.book_id)
            .field("metadata", &self.metadata)
            .field("location", &self.location)
            .field("restored", &self.restored)
            .finish_non_exhaustive()
    }
}

/// Timeouts applied to the suspending steps of a load
#[derive(Debug, Clone, Copy)]
pub struct LoaderTimeouts {
    pub fetch: Duration,
    pub restore: Duration,
}

impl Default for LoaderTimeouts {
    fn default() -> Self {
        Self {
            fetch: crate::config::DEFAULT_FETCH_TIMEOUT,
            restore: crate::config::DEFAULT_RESTORE_TIMEOUT,
        }
    }
}

/// Everything owned by the currently attached book
struct Attached {
    book_id: String,
    rendition: Arc<dyn Rendition>,
    session: Option<Session>,
    subscription: Option<Subscription>,
}

/// Releases the in-flight flag on every exit path
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Loads books onto the single rendering surface
pub struct BookLoader {
    engine: Arc<dyn RenderEngine>,
    content: Arc<dyn ContentStore>,
    surface: RenderSurface,
    tracker: ProgressTracker,
    events: EventBus,
    timeouts: LoaderTimeouts,
    in_flight: AtomicBool,
    state: watch::Sender<LoadState>,
    attached: Mutex<Option<Attached>>,
}

impl BookLoader {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        content: Arc<dyn ContentStore>,
        surface: RenderSurface,
        tracker: ProgressTracker,
        events: EventBus,
        timeouts: LoaderTimeouts,
    ) -> Self {
        let (state, _) = watch::channel(LoadState::Idle);
        Self {
            engine,
            content,
            surface,
            tracker,
            events,
            timeouts,
            in_flight: AtomicBool::new(false),
            state,
            attached: Mutex::new(None),
        }
    }

    /// Watch state transitions
    pub fn state(&self) -> watch::Receiver<LoadState> {
        self.state.subscribe()
    }

    pub fn current_state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Rendition of the attached book, if any
    pub async fn rendition(&self) -> Option<Arc<dyn Rendition>> {
        self.attached.lock().await.as_ref().map(|a| a.rendition.clone())
    }

    /// Id of the attached book, if any
    pub async fn current_book(&self) -> Option<String> {
        self.attached.lock().await.as_ref().map(|a| a.book_id.clone())
    }

    fn set_state(&self, state: LoadState) {
        tracing::debug!(state = %state, "Loader state");
        self.state.send_replace(state);
    }

    /// Load a book, replacing whatever is attached
    pub async fn load(&self, request: LoadRequest) -> Result<LoadedBook, LoadError> {
        let book_id = request.source.book_id().to_string();
        let Some(_guard) = InFlightGuard::acquire(&self.in_flight) else {
            tracing::warn!(book_id = %book_id, "Load already in progress, ignoring request");
            self.events.emit(AppEvent::LoadRejected { requested: book_id });
            return Err(LoadError::Busy);
        };

        tracing::info!(book_id = %book_id, "Loading book");
        match self.run(request).await {
            Ok(book) => {
                self.set_state(LoadState::Ready);
                tracing::info!(book_id = %book.book_id, restored = book.restored, "Book ready");
                Ok(book)
            }
            Err(e) => {
                tracing::error!(book_id = %book_id, error = %e, "Failed to load book");
                self.set_state(LoadState::Error(e.to_string()));
                Err(e)
            }
        }
    }

    async fn run(&self, request: LoadRequest) -> Result<LoadedBook, LoadError> {
        self.set_state(LoadState::Cleanup);
        self.cleanup().await;

        self.set_state(LoadState::Fetching);
        let (book_id, content) = match request.source {
            LoadSource::Bytes { book_id, content } => (book_id, content),
            LoadSource::Stored { book_id } => {
                let content = tokio::time::timeout(self.timeouts.fetch, self.content.load(&book_id))
                    .await
                    .map_err(|_| RetrievalError::Timeout(self.timeouts.fetch))??;
                (book_id, content)
            }
        };
        if content.is_empty() {
            return Err(RetrievalError::EmptyContent(book_id).into());
        }

        self.set_state(LoadState::InitializingRenderer);
        let handle = self.surface.claim(&book_id)?;
        let opened = tokio::time::timeout(self.timeouts.fetch, self.engine.open(content, &handle))
            .await
            .map_err(|_| RenderError::Timeout(self.timeouts.fetch))
            .and_then(|result| result);
        let rendition = match opened {
            Ok(rendition) => rendition,
            Err(e) => {
                self.surface.release();
                return Err(e.into());
            }
        };

        self.set_state(LoadState::RestoringPosition);
        let (location, restored) = match self.restore(&rendition, request.saved_cfi.as_deref()).await {
            Ok(shown) => shown,
            Err(e) => {
                rendition.destroy();
                self.surface.release();
                return Err(e.into());
            }
        };

        let session = self.tracker.open(&book_id);
        let subscription = self.tracker.listen(&session, rendition.clone());
        *self.attached.lock().await = Some(Attached {
            book_id: book_id.clone(),
            rendition: rendition.clone(),
            session: Some(session),
            subscription: Some(subscription),
        });

        Ok(LoadedBook {
            book_id,
            metadata: rendition.metadata(),
            toc: rendition.toc(),
            rendition,
            location,
            restored,
        })
    }

    /// Show the saved position, falling back to the start of the book
    async fn restore(
        &self,
        rendition: &Arc<dyn Rendition>,
        saved_cfi: Option<&str>,
    ) -> Result<(Location, bool), RenderError> {
        let limit = self.timeouts.restore;
        if let Some(cfi) = saved_cfi {
            match tokio::time::timeout(limit, rendition.display(Some(cfi))).await {
                Ok(Ok(location)) => return Ok((location, true)),
                Ok(Err(e)) => {
                    tracing::warn!(cfi, error = %e, "Could not restore position, starting from the beginning");
                }
                Err(_) => {
                    tracing::warn!(cfi, ?limit, "Restoring position timed out, starting from the beginning");
                }
            }
        }

        let location = tokio::time::timeout(limit, rendition.display(None))
            .await
            .map_err(|_| RenderError::Timeout(limit))??;
        Ok((location, false))
    }

    /// Detach the current book; safe to call any number of times
    pub async fn cleanup(&self) {
        let attached = self.attached.lock().await.take();
        if let Some(mut attached) = attached {
            if let Some(subscription) = attached.subscription.take() {
                subscription.finish().await;
            }
            if let Some(session) = attached.session.take() {
                self.tracker.close(&session).await;
            }
            attached.rendition.clear_annotations();
            attached.rendition.destroy();
            tracing::debug!(book_id = %attached.book_id, "Detached book");
        }
        self.surface.release();
    }

    /// Close the reader: detach the book and return to idle
    pub async fn close(&self) {
        self.cleanup().await;
        if !self.is_loading() {
            self.set_state(LoadState::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::KvContentStore;
    use crate::library::Library;
    use crate::storage::{MemoryStorage, Store};
    use crate::types::{BookRecord, HighlightColor, ReadingSettings};
    use crate::render::{SearchHit, SurfaceHandle};
    use async_trait::async_trait;
    use std::sync::Mutex as StdMutex;
    use tokio::sync::{broadcast, Notify};

    /// Rendition over a fixed list of documents
    struct FakeRendition {
        docs: Vec<String>,
        position: StdMutex<usize>,
        destroyed: AtomicBool,
        annotations: StdMutex<usize>,
        events: broadcast::Sender<Location>,
    }

    impl FakeRendition {
        fn location(&self, index: usize) -> Location {
            Location {
                cfi: format!("epubcfi(/6/{}!)", (index + 1) * 2),
                href: self.docs[index].clone(),
            }
        }

        fn go_to(&self, index: usize) -> Result<Location, RenderError> {
            if self.destroyed.load(Ordering::SeqCst) {
                return Err(RenderError::Destroyed);
            }
            *self.position.lock().unwrap() = index;
            let location = self.location(index);
            let _ = self.events.send(location.clone());
            Ok(location)
        }

        fn index_of(&self, cfi: &str) -> Option<usize> {
            let step: usize = cfi
                .strip_prefix("epubcfi(/6/")?
                .strip_suffix("!)")?
                .parse()
                .ok()?;
            let index = step.checked_div(2)?.checked_sub(1)?;
            (index < self.docs.len()).then_some(index)
        }
    }

    #[async_trait]
    impl Rendition for FakeRendition {
        fn metadata(&self) -> BookMetadata {
            BookMetadata {
                title: "Fake".into(),
                author: "Tester".into(),
                ..BookMetadata::default()
            }
        }

        fn toc(&self) -> Vec<TocEntry> {
            Vec::new()
        }

        async fn display(&self, target: Option<&str>) -> Result<Location, RenderError> {
            let index = match target {
                None => 0,
                Some(cfi) => self
                    .index_of(cfi)
                    .ok_or_else(|| RenderError::InvalidTarget(cfi.to_string()))?,
            };
            self.go_to(index)
        }

        async fn next(&self) -> Result<Location, RenderError> {
            let index = (*self.position.lock().unwrap() + 1).min(self.docs.len() - 1);
            self.go_to(index)
        }

        async fn prev(&self) -> Result<Location, RenderError> {
            let index = self.position.lock().unwrap().saturating_sub(1);
            self.go_to(index)
        }

        fn current(&self) -> Option<Location> {
            Some(self.location(*self.position.lock().unwrap()))
        }

        fn percentage_from_cfi(&self, cfi: &str) -> Option<f64> {
            let index = self.index_of(cfi)?;
            Some(index as f64 / (self.docs.len() - 1) as f64)
        }

        fn subscribe(&self) -> broadcast::Receiver<Location> {
            self.events.subscribe()
        }

        fn apply_settings(&self, _settings: &ReadingSettings) {}

        fn add_highlight(&self, _cfi_range: &str, _color: HighlightColor) {
            *self.annotations.lock().unwrap() += 1;
        }

        fn clear_annotations(&self) {
            *self.annotations.lock().unwrap() = 0;
        }

        async fn search(&self, _query: &str) -> Result<Vec<SearchHit>, RenderError> {
            Ok(Vec::new())
        }

        fn destroy(&self) {
            self.destroyed.store(true, Ordering::SeqCst);
        }
    }

    /// Engine handing out fake renditions, optionally blocking in `open`
    #[derive(Default)]
    struct FakeEngine {
        gate: Option<Arc<Notify>>,
        last: StdMutex<Option<Arc<FakeRendition>>>,
    }

    #[async_trait]
    impl RenderEngine for FakeEngine {
        async fn inspect(&self, _content: &[u8]) -> Result<BookMetadata, RenderError> {
            Ok(BookMetadata::default())
        }

        async fn open(
            &self,
            content: Vec<u8>,
            _surface: &SurfaceHandle,
        ) -> Result<Arc<dyn Rendition>, RenderError> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if content.starts_with(b"garbage") {
                return Err(RenderError::Parse("not a zip archive".into()));
            }
            let (events, _) = broadcast::channel(16);
            let rendition = Arc::new(FakeRendition {
                docs: (0..11).map(|i| format!("ch{}.xhtml", i)).collect(),
                position: StdMutex::new(0),
                destroyed: AtomicBool::new(false),
                annotations: StdMutex::new(0),
                events,
            });
            *self.last.lock().unwrap() = Some(rendition.clone());
            Ok(rendition)
        }
    }

    struct Fixture {
        loader: Arc<BookLoader>,
        engine: Arc<FakeEngine>,
        surface: RenderSurface,
        library: Library,
        events: EventBus,
    }

    async fn fixture(gate: Option<Arc<Notify>>) -> Fixture {
        let store = Store::new(Arc::new(MemoryStorage::new()));
        let library = Library::load(store.clone()).await;
        library.upsert(BookRecord::new("b1", "Dune", "Frank Herbert")).await.unwrap();
        let content = KvContentStore::new(store);
        content.save("b1", b"PK\x03\x04book".to_vec()).await.unwrap();

        let events = EventBus::default();
        let tracker = ProgressTracker::new(library.clone(), Duration::from_millis(500), events.clone());
        let surface = RenderSurface::new();
        surface.mount();
        let engine = Arc::new(FakeEngine {
            gate,
            ..FakeEngine::default()
        });
        let loader = Arc::new(BookLoader::new(
            engine.clone(),
            Arc::new(content),
            surface.clone(),
            tracker,
            events.clone(),
            LoaderTimeouts::default(),
        ));
        Fixture {
            loader,
            engine,
            surface,
            library,
            events,
        }
    }

    #[tokio::test]
    async fn test_load_reaches_ready_and_restores() {
        let fx = fixture(None).await;
        let book = fx
            .loader
            .load(LoadRequest::stored("b1", Some("epubcfi(/6/8!)".into())))
            .await
            .unwrap();

        assert!(book.restored);
        assert_eq!(book.location.cfi, "epubcfi(/6/8!)");
        assert_eq!(fx.loader.current_state(), LoadState::Ready);
        assert_eq!(fx.surface.owner().as_deref(), Some("b1"));
        assert!(!fx.loader.is_loading());
    }

    #[tokio::test]
    async fn test_corrupt_marker_falls_back_to_start() {
        let fx = fixture(None).await;
        let book = fx
            .loader
            .load(LoadRequest::stored("b1", Some("epubcfi(/6/999!)".into())))
            .await
            .unwrap();

        assert!(!book.restored);
        assert_eq!(book.location.cfi, "epubcfi(/6/2!)");
    }

    #[tokio::test]
    async fn test_missing_content_is_an_error_state() {
        let fx = fixture(None).await;
        let err = fx
            .loader
            .load(LoadRequest::stored("ghost", None))
            .await
            .unwrap_err();

        assert!(matches!(err, LoadError::Retrieval(RetrievalError::NotFound(_))));
        assert!(matches!(fx.loader.current_state(), LoadState::Error(_)));
        assert_eq!(fx.surface.owner(), None);
        assert!(!fx.loader.is_loading());
    }

    #[tokio::test]
    async fn test_parse_failure_releases_surface() {
        let fx = fixture(None).await;
        let request = LoadRequest {
            source: LoadSource::Bytes {
                book_id: "x".into(),
                content: b"garbage".to_vec(),
            },
            saved_cfi: None,
        };
        assert!(matches!(
            fx.loader.load(request).await,
            Err(LoadError::Render(RenderError::Parse(_)))
        ));
        assert_eq!(fx.surface.owner(), None);
    }

    #[tokio::test]
    async fn test_unmounted_surface_fails_fast() {
        let fx = fixture(None).await;
        fx.surface.unmount();
        assert!(matches!(
            fx.loader.load(LoadRequest::stored("b1", None)).await,
            Err(LoadError::Render(RenderError::SurfaceNotReady))
        ));
    }

    #[tokio::test]
    async fn test_second_load_is_rejected_while_first_runs() {
        let gate = Arc::new(Notify::new());
        let fx = fixture(Some(gate.clone())).await;
        let mut events = fx.events.subscribe();

        let first = {
            let loader = fx.loader.clone();
            tokio::spawn(async move { loader.load(LoadRequest::stored("b1", None)).await })
        };
        let mut state = fx.loader.state();
        state
            .wait_for(|s| *s == LoadState::InitializingRenderer)
            .await
            .unwrap();

        let second = fx.loader.load(LoadRequest::stored("b1", None)).await;
        assert!(matches!(second, Err(LoadError::Busy)));
        assert_eq!(
            events.recv().await.unwrap(),
            AppEvent::LoadRejected {
                requested: "b1".into()
            }
        );

        gate.notify_one();
        assert!(first.await.unwrap().is_ok());
        assert!(!fx.loader.is_loading());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let fx = fixture(None).await;
        fx.loader.load(LoadRequest::stored("b1", None)).await.unwrap();
        let rendition = fx.engine.last.lock().unwrap().clone().unwrap();
        rendition.add_highlight("epubcfi(/6/4!)", HighlightColor::Yellow);

        fx.loader.close().await;
        fx.loader.close().await;
        fx.loader.cleanup().await;

        assert!(rendition.destroyed.load(Ordering::SeqCst));
        assert_eq!(*rendition.annotations.lock().unwrap(), 0);
        assert_eq!(fx.surface.owner(), None);
        assert_eq!(fx.loader.current_state(), LoadState::Idle);
        assert!(fx.loader.rendition().await.is_none());
    }

    #[tokio::test]
    async fn test_position_events_update_progress() {
        let fx = fixture(None).await;
        let book = fx.loader.load(LoadRequest::stored("b1", None)).await.unwrap();

        book.rendition.display(Some("epubcfi(/6/12!)")).await.unwrap();
        // Give the listener task a chance to run
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        fx.loader.close().await;

        let record = fx.library.get("b1").await.unwrap();
        assert_eq!(record.cfi.as_deref(), Some("epubcfi(/6/12!)"));
        assert_eq!(record.progress, 50);
    }
}
