//! Reading-progress tracking
//!
//! Location changes update the in-memory library at once; writes to storage
//! go through a single writer task that batches them. The first update after
//! a write opens a window; when it ends, one write carries the latest
//! position. A burst of page turns costs one write and a steady stream of
//! them still reaches storage once per window.

use crate::events::{AppEvent, EventBus};
use crate::library::Library;
use crate::render::{Location, Rendition};
use crate::storage::keys;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Convert a rendition fraction into a whole percentage
///
/// NaN maps to 0; everything else is rounded and clamped to 0..=100.
pub fn percent_from_fraction(fraction: f64) -> u8 {
    if fraction.is_nan() {
        return 0;
    }
    (fraction * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Token for the book whose progress is currently tracked
///
/// Every `open` bumps a generation counter, so events carrying an older
/// session are recognised as belonging to a previous book and dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    generation: u64,
    book_id: String,
}

impl Session {
    pub fn book_id(&self) -> &str {
        &self.book_id
    }
}

/// Location listener registered on a rendition
///
/// Dropping the subscription stops the listener at once; [`finish`]
/// stops it after every location already reported has been recorded.
///
/// [`finish`]: Subscription::finish
#[derive(Debug)]
pub struct Subscription {
    stop: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Record the locations already reported, then stop listening
    pub async fn finish(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[derive(Debug)]
struct PendingWrite {
    book_id: String,
    cfi: String,
}

#[derive(Debug)]
enum WriterMessage {
    Update(PendingWrite),
    Flush(oneshot::Sender<()>),
}

struct Inner {
    library: Library,
    active: AtomicU64,
    next_generation: AtomicU64,
    writer: mpsc::UnboundedSender<WriterMessage>,
}

/// Debounced progress writer shared by the loader and its listeners
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<Inner>,
}

impl ProgressTracker {
    /// Create a tracker and spawn its writer task
    pub fn new(library: Library, window: Duration, events: EventBus) -> Self {
        let (writer, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_writer(rx, library.clone(), window, events));
        Self {
            inner: Arc::new(Inner {
                library,
                active: AtomicU64::new(0),
                next_generation: AtomicU64::new(1),
                writer,
            }),
        }
    }

    /// Start tracking `book_id`, superseding any previous session
    pub fn open(&self, book_id: &str) -> Session {
        let generation = self.inner.next_generation.fetch_add(1, Ordering::SeqCst);
        self.inner.active.store(generation, Ordering::SeqCst);
        tracing::debug!(book_id, generation, "Progress session opened");
        Session {
            generation,
            book_id: book_id.to_string(),
        }
    }

    /// Whether `session` is the one being tracked
    pub fn is_active(&self, session: &Session) -> bool {
        self.inner.active.load(Ordering::SeqCst) == session.generation
    }

    /// Forward every location change of `rendition` into `record`
    pub fn listen(&self, session: &Session, rendition: Arc<dyn Rendition>) -> Subscription {
        let mut rx = rendition.subscribe();
        let (stop, mut stopped) = oneshot::channel::<()>();
        let tracker = self.clone();
        let session = session.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    received = rx.recv() => match received {
                        Ok(Location { cfi, .. }) => {
                            let fraction = rendition.percentage_from_cfi(&cfi);
                            tracker.record(&session, &cfi, fraction).await;
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!(skipped, "Progress listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => return,
                    },
                    _ = &mut stopped => break,
                }
            }

            // Drain what was reported before the stop request
            loop {
                match rx.try_recv() {
                    Ok(Location { cfi, .. }) => {
                        let fraction = rendition.percentage_from_cfi(&cfi);
                        tracker.record(&session, &cfi, fraction).await;
                    }
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
        });
        Subscription {
            stop: Some(stop),
            handle: Some(handle),
        }
    }

    /// Record a new position for the session's book
    ///
    /// Returns false when the event was discarded.
    pub async fn record(&self, session: &Session, cfi: &str, fraction: Option<f64>) -> bool {
        if !self.is_active(session) {
            tracing::debug!(book_id = %session.book_id, cfi, "Discarding stale location event");
            return false;
        }

        let progress = percent_from_fraction(fraction.unwrap_or(0.0));
        if !self
            .inner
            .library
            .set_progress_in_memory(&session.book_id, cfi, progress)
            .await
        {
            tracing::debug!(book_id = %session.book_id, "Book no longer in library");
            return false;
        }

        let _ = self.inner.writer.send(WriterMessage::Update(PendingWrite {
            book_id: session.book_id.clone(),
            cfi: cfi.to_string(),
        }));
        true
    }

    /// Write any pending update now
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.inner.writer.send(WriterMessage::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }

    /// Flush pending progress, then stop accepting events for `session`
    pub async fn close(&self, session: &Session) {
        self.flush().await;
        if self
            .inner
            .active
            .compare_exchange(session.generation, 0, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            tracing::debug!(book_id = %session.book_id, "Progress session closed");
        }
    }
}

async fn run_writer(
    mut rx: mpsc::UnboundedReceiver<WriterMessage>,
    library: Library,
    window: Duration,
    events: EventBus,
) {
    // Latest update plus the deadline set when it became pending
    let mut pending: Option<(PendingWrite, Instant)> = None;
    loop {
        let message = match pending.as_ref().map(|(_, deadline)| *deadline) {
            Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                Ok(message) => message,
                Err(_) => {
                    if let Some((write, _)) = pending.take() {
                        persist(&library, &events, write).await;
                    }
                    continue;
                }
            },
            None => rx.recv().await,
        };

        match message {
            Some(WriterMessage::Update(write)) => {
                let deadline = match pending.take() {
                    Some((_, deadline)) => deadline,
                    None => Instant::now() + window,
                };
                pending = Some((write, deadline));
            }
            Some(WriterMessage::Flush(ack)) => {
                if let Some((write, _)) = pending.take() {
                    persist(&library, &events, write).await;
                }
                let _ = ack.send(());
            }
            None => {
                if let Some((write, _)) = pending.take() {
                    persist(&library, &events, write).await;
                }
                break;
            }
        }
    }
}

async fn persist(library: &Library, events: &EventBus, write: PendingWrite) {
    match library.persist().await {
        Ok(()) => tracing::debug!(book_id = %write.book_id, cfi = %write.cfi, "Progress saved"),
        Err(e) => {
            tracing::error!(book_id = %write.book_id, error = %e, "Failed to save progress");
            events.emit(AppEvent::PersistFailed {
                key: keys::BOOKS.to_string(),
                message: e.to_string(),
            });
        }
    }
}
