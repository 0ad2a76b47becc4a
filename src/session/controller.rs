use std::sync::Arc;

use futures::future::BoxFuture;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::AutoGrowBuilder;
use super::cache::PageCache;
use super::hooks::{ItemsReturned, OnComplete};
use crate::config::AutoGrowOptions;
use crate::cursor::PagingCursor;
use crate::error::AutoBrowseError;
use crate::event::{Event, EventSender};
use crate::render::Renderer;
use crate::surface::{Container, ScrollMetrics, Viewport};
use crate::transport::{PageRequest, Transport};

/// Where a session is in its fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SessionPhase {
    /// Waiting for the container's bottom to scroll into view
    #[default]
    Idle,
    /// One request is outstanding
    Loading,
    /// The server ran out of items; no further requests are made
    Exhausted,
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Loading => write!(f, "loading"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// Summary of a session, returned when it stops running
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub url: String,
    pub offset: u64,
    pub phase: SessionPhase,
    pub pages_loaded: usize,
    pub render_failures: usize,
    pub fetch_failures: usize,
    /// Whether the page cache still covers every fetched page, `None` without storage
    pub cache_complete: Option<bool>,
}

#[derive(Debug, Default)]
struct SessionStats {
    pages_loaded: usize,
    render_failures: usize,
    fetch_failures: usize,
}

/// A growing container: fetches and appends the next page whenever the
/// bottom of the container scrolls into view.
///
/// Build one with [`AutoGrow::builder`], then either drive it with
/// [`run`](Self::run) or step it by hand with [`attach`](Self::attach),
/// [`poll_scroll`](Self::poll_scroll) and [`complete_fetch`](Self::complete_fetch).
pub struct AutoGrow {
    pub(super) url: String,
    pub(super) options: AutoGrowOptions,
    pub(super) cursor: PagingCursor,
    pub(super) phase: SessionPhase,
    pub(super) transport: Arc<dyn Transport>,
    pub(super) renderer: Arc<dyn Renderer>,
    pub(super) container: Arc<dyn Container>,
    pub(super) viewport: Arc<dyn Viewport>,
    pub(super) items_returned: ItemsReturned,
    pub(super) on_complete: OnComplete,
    pub(super) cache: Option<PageCache>,
    pub(super) events: EventSender,
    pub(super) attached: bool,
    stats: SessionStats,
}

impl AutoGrow {
    /// Start building a session for the endpoint at `url`
    pub fn builder(url: impl Into<String>) -> AutoGrowBuilder {
        AutoGrowBuilder::new(url)
    }

    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        url: String,
        options: AutoGrowOptions,
        transport: Arc<dyn Transport>,
        renderer: Arc<dyn Renderer>,
        container: Arc<dyn Container>,
        viewport: Arc<dyn Viewport>,
        items_returned: ItemsReturned,
        on_complete: OnComplete,
        cache: Option<PageCache>,
        events: EventSender,
    ) -> Self {
        let cursor = PagingCursor::new(options.offset, options.count, options.total_count);
        Self {
            url,
            options,
            cursor,
            phase: SessionPhase::Idle,
            transport,
            renderer,
            container,
            viewport,
            items_returned,
            on_complete,
            cache,
            events,
            attached: false,
            stats: SessionStats::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &AutoGrowOptions {
        &self.options
    }

    /// Items fetched so far, counted from zero
    pub fn offset(&self) -> u64 {
        self.cursor.current()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_loading(&self) -> bool {
        self.phase == SessionPhase::Loading
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Page cache, present when the session persists its pages
    pub fn cache(&self) -> Option<&PageCache> {
        self.cache.as_ref()
    }

    pub fn report(&self) -> SessionReport {
        SessionReport {
            url: self.url.clone(),
            offset: self.cursor.current(),
            phase: self.phase,
            pages_loaded: self.stats.pages_loaded,
            render_failures: self.stats.render_failures,
            fetch_failures: self.stats.fetch_failures,
            cache_complete: self.cache.as_ref().map(PageCache::is_complete),
        }
    }

    /// Bring the container up to date before listening for scrolls.
    ///
    /// With storage enabled this replays persisted pages for the same URL,
    /// fetches whatever the cache is missing in one request, and restores the
    /// persisted scroll position. Calling it again is a no-op.
    pub async fn attach(&mut self) -> Result<(), AutoBrowseError> {
        if self.attached {
            return Ok(());
        }

        let replayed = if self.cache.is_some() {
            self.restore_from_cache().await?
        } else {
            0
        };

        self.attached = true;
        info!(url = %self.url, offset = self.cursor.current(), replayed, "session attached");
        self.events.emit(Event::Attached {
            url: self.url.clone(),
            offset: self.cursor.current(),
            replayed_pages: replayed,
        });

        Ok(())
    }

    async fn restore_from_cache(&mut self) -> Result<usize, AutoBrowseError> {
        let Some(cache) = self.cache.as_mut() else {
            return Ok(0);
        };

        let owner = cache.owner().await.map_err(AutoBrowseError::storage)?;
        if owner.as_deref() != Some(self.url.as_str()) {
            cache.reset().await.map_err(AutoBrowseError::storage)?;
            if owner.is_some() {
                info!(previous = ?owner, url = %self.url, "persisted pages belong to another url, discarded");
                self.events.emit(Event::CacheReset {
                    previous_url: owner,
                });
            }
        }

        let stored = cache.stored_pages().await.map_err(AutoBrowseError::storage)?;
        let stored_offset = cache.stored_offset().await.map_err(AutoBrowseError::storage)?;
        let scroll_top = cache
            .stored_scroll_top()
            .await
            .map_err(AutoBrowseError::storage)?;

        let replayed = match stored {
            Some(mut pages) => {
                let mut items = 0;
                for page in pages.iter_mut() {
                    items += self.replay_page(page);
                }
                let replayed = pages.len();

                let missing = stored_offset
                    .and_then(|stored| stored.checked_sub(self.cursor.current()))
                    .filter(|missing| *missing > 0);

                if let Some(cache) = self.cache.as_mut() {
                    cache.restore(pages, items, true);
                }
                debug!(replayed, items, ?missing, "replayed cached pages");

                if let Some(missing) = missing {
                    self.catch_up(missing).await;
                }
                replayed
            }
            None => {
                let offset = self.cursor.current();
                if let Some(cache) = self.cache.as_mut() {
                    let stored = cache
                        .initialize(&self.url, offset)
                        .await
                        .map_err(AutoBrowseError::storage)?;
                    if !stored {
                        warn!("store refused initial session state");
                        self.events.emit(Event::StorageWarning {
                            message: "store refused initial session state".to_string(),
                        });
                    }
                }
                0
            }
        };

        if let Some(top) = scroll_top.filter(|top| *top > 0) {
            debug!(scroll_top = top, "restoring scroll position");
            self.viewport.set_scroll_top(top);
        }

        Ok(replayed)
    }

    /// Render a cached page and count it, returning its item count
    fn replay_page(&mut self, page: &mut Value) -> u64 {
        let offset = self.cursor.current();
        let items = (self.items_returned)(page);
        self.render_page(page, offset);
        self.cursor.advance(items);
        (self.on_complete)(page);
        items
    }

    /// Fetch the `count` items a truncated cache did not cover. The page is
    /// shown and counted but never cached.
    async fn catch_up(&mut self, count: u64) {
        let request = PageRequest::new(self.cursor.current(), count);
        info!(offset = request.offset, count, "fetching items missing from the page cache");

        self.container.insert_loader(&self.options.loader);
        self.phase = SessionPhase::Loading;
        self.events.emit(Event::CatchUpStarted { request });

        let response = self.transport.fetch(&self.url, request).await;
        match response {
            Ok(mut page) => {
                let items = (self.items_returned)(&page);
                self.render_page(&page, request.offset);
                (self.on_complete)(&mut page);
                if items > 0 {
                    if let Some(cache) = self.cache.as_mut() {
                        cache.mark_incomplete();
                    }
                }
                self.cursor.advance(items);
                self.stats.pages_loaded += 1;
                self.events.emit(Event::PageLoaded {
                    request,
                    items,
                    offset: self.cursor.current(),
                });
            }
            Err(e) => self.record_fetch_failure(request, &e),
        }

        self.container.remove_loader();
        self.phase = SessionPhase::Idle;
    }

    /// Decide whether a scroll warrants a request and, if so, start one.
    ///
    /// Returns the request to send when the container's bottom is in view,
    /// nothing is outstanding and the server may have more items. The
    /// session is `Loading` until [`complete_fetch`](Self::complete_fetch)
    /// is called with the outcome. Nothing is requested before
    /// [`attach`](Self::attach) has replayed the cache.
    pub fn poll_scroll(&mut self, metrics: &ScrollMetrics) -> Option<PageRequest> {
        if !self.is_attached()
            || self.phase != SessionPhase::Idle
            || !metrics.bottom_in_view()
            || !self.cursor.has_more()
        {
            return None;
        }

        let request = self.cursor.next_request();
        self.container.insert_loader(&self.options.loader);
        self.phase = SessionPhase::Loading;

        debug!(offset = request.offset, count = request.count, "container bottom in view, fetching");
        self.events.emit(Event::FetchStarted { request });

        Some(request)
    }

    /// Process the outcome of a request started by [`poll_scroll`](Self::poll_scroll)
    pub async fn complete_fetch(&mut self, request: PageRequest, response: anyhow::Result<Value>) {
        let mut page = match response {
            Ok(page) => page,
            Err(e) => {
                self.record_fetch_failure(request, &e);
                self.container.remove_loader();
                self.phase = SessionPhase::Idle;
                return;
            }
        };

        let items = (self.items_returned)(&page);
        let last = self.cursor.is_final_page(items);

        if items > 0 {
            let offset = self.cursor.current();
            self.render_page(&page, offset);
            (self.on_complete)(&mut page);

            if let Some(cache) = self.cache.as_mut() {
                if cache.is_contiguous_with(offset) && !cache.append(page, items).await {
                    self.events.emit(Event::CacheWriteFailed { offset });
                }
            }

            self.cursor.advance(items);
            self.stats.pages_loaded += 1;

            if let Some(cache) = self.cache.as_ref() {
                let saved = cache.save_offset(self.cursor.current()).await;
                if !matches!(saved, Ok(true)) {
                    let message = match saved {
                        Err(e) => format!("failed to persist offset: {:#}", e),
                        _ => "store refused offset update".to_string(),
                    };
                    warn!(offset = self.cursor.current(), "{}", message);
                    self.events.emit(Event::StorageWarning { message });
                }
            }

            self.events.emit(Event::PageLoaded {
                request,
                items,
                offset: self.cursor.current(),
            });
        }

        self.container.remove_loader();

        if last {
            info!(offset = self.cursor.current(), "no more items, session exhausted");
            self.phase = SessionPhase::Exhausted;
            self.events.emit(Event::Exhausted {
                offset: self.cursor.current(),
            });
        } else {
            self.phase = SessionPhase::Idle;
        }
    }

    /// Render `page` into the container. Failures are reported, never raised.
    fn render_page(&mut self, page: &Value, offset: u64) {
        match self.renderer.render(page) {
            Ok(markup) => self.container.append(&markup),
            Err(e) => {
                warn!(offset, error = %e, "failed to render page");
                self.stats.render_failures += 1;
                self.events.emit(Event::RenderFailed {
                    offset,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    fn record_fetch_failure(&mut self, request: PageRequest, error: &anyhow::Error) {
        warn!(offset = request.offset, count = request.count, error = %error, "page request failed");
        self.stats.fetch_failures += 1;
        self.events.emit(Event::FetchFailed {
            request,
            error: format!("{:#}", error),
        });
    }

    pub(super) async fn save_scroll_top(&self, top: u64) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };
        match cache.save_scroll_top(top).await {
            Ok(true) => debug!(scroll_top = top, "saved scroll position"),
            Ok(false) => warn!(scroll_top = top, "store refused scroll position"),
            Err(e) => warn!(error = %e, "failed to persist scroll position"),
        }
    }

    /// Request future that owns everything it needs, so it can be polled
    /// alongside scroll signals
    pub(super) fn fetch_future(
        &self,
        request: PageRequest,
    ) -> BoxFuture<'static, anyhow::Result<Value>> {
        let transport = Arc::clone(&self.transport);
        let url = self.url.clone();
        Box::pin(async move { transport.fetch(&url, request).await })
    }
}
