use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Container, Viewport};

#[derive(Debug, Default)]
struct BufferState {
    fragments: Vec<String>,
    loader: Option<String>,
    lines: u64,
}

/// Container that keeps appended markup in memory, one row per line.
///
/// With [`echo`](Self::echo) every appended fragment is also written to
/// stdout, which is how the CLI shows a session.
#[derive(Debug, Default)]
pub struct BufferContainer {
    state: Mutex<BufferState>,
    offset_top: u64,
    echo: bool,
}

impl BufferContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Container that also prints appended markup to stdout
    pub fn echo() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Place the container `top` rows below the start of the document
    pub fn with_offset_top(mut self, top: u64) -> Self {
        self.offset_top = top;
        self
    }

    /// Fragments appended so far, in order
    pub fn fragments(&self) -> Vec<String> {
        self.lock().fragments.clone()
    }

    /// Loader markup currently shown
    pub fn loader(&self) -> Option<String> {
        self.lock().loader.clone()
    }

    fn lock(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Container for BufferContainer {
    fn append(&self, markup: &str) {
        if markup.is_empty() {
            return;
        }
        let mut state = self.lock();
        state.lines += markup.lines().count() as u64;
        state.fragments.push(markup.to_string());
        if self.echo {
            println!("{}", markup);
        }
    }

    fn insert_loader(&self, markup: &str) {
        self.lock().loader = Some(markup.to_string());
    }

    fn remove_loader(&self) {
        self.lock().loader = None;
    }

    fn offset_top(&self) -> u64 {
        self.offset_top
    }

    fn height(&self) -> u64 {
        self.lock().lines
    }
}

/// Viewport that always shows the end of a container, like `tail -f`.
///
/// Every scroll signal therefore finds the container's bottom in view, so a
/// session driven by it keeps fetching until the data runs out.
pub struct TailViewport {
    container: Arc<dyn Container>,
    height: u64,
    restored: AtomicU64,
}

impl TailViewport {
    pub fn new(container: Arc<dyn Container>, height: u64) -> Self {
        Self {
            container,
            height: height.max(1),
            restored: AtomicU64::new(0),
        }
    }

    /// Last scroll offset a session asked to restore
    pub fn restored_scroll_top(&self) -> u64 {
        self.restored.load(Ordering::Relaxed)
    }
}

impl Viewport for TailViewport {
    fn scroll_top(&self) -> u64 {
        self.container.offset_top() + self.container.height()
    }

    fn height(&self) -> u64 {
        self.height
    }

    fn set_scroll_top(&self, top: u64) {
        self.restored.store(top, Ordering::Relaxed);
    }
}
