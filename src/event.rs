use tokio::sync::mpsc;

use crate::transport::PageRequest;

/// Events emitted while a session runs.
///
/// Failures the session recovers from on its own (a template that does not
/// render, a full store, an unreachable endpoint) only show up here.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The session finished attaching and is ready for scroll signals
    Attached {
        url: String,
        offset: u64,
        replayed_pages: usize,
    },
    /// Persisted state belonged to another URL and was discarded
    CacheReset { previous_url: Option<String> },
    /// A request was sent
    FetchStarted { request: PageRequest },
    /// A catch-up request was sent to fill the gap left by an incomplete cache
    CatchUpStarted { request: PageRequest },
    /// A page was rendered and counted
    PageLoaded {
        request: PageRequest,
        items: u64,
        offset: u64,
    },
    /// A page could not be rendered; it still counts towards the offset
    RenderFailed { offset: u64, error: String },
    /// A request failed; the session is ready to try again
    FetchFailed {
        request: PageRequest,
        error: String,
    },
    /// A page did not fit in the store; the cache no longer covers every page
    CacheWriteFailed { offset: u64 },
    /// A persistence write other than the page cache failed
    StorageWarning { message: String },
    /// The server has no more items; the session stops listening
    Exhausted { offset: u64 },
}

/// Sender for session events.
///
/// Wraps a `tokio::sync::mpsc::Sender<Event>`. If constructed with `noop()`,
/// all sends are silently dropped.
#[derive(Clone, Default)]
pub struct EventSender {
    inner: Option<mpsc::Sender<Event>>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self {
            inner: Some(sender),
        }
    }

    /// Create a no-op sender that silently drops all events.
    pub fn noop() -> Self {
        Self { inner: None }
    }

    /// Create a sender together with its receiving end.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Emit an event (best-effort, drops on backpressure).
    pub fn emit(&self, event: Event) {
        if let Some(ref sender) = self.inner {
            let _ = sender.try_send(event);
        }
    }

    /// Returns true if this sender is connected (not noop).
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}
