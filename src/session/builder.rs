use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::time::Duration;
use tracing::debug;

use super::cache::PageCache;
use super::controller::AutoGrow;
use super::hooks::{ItemsReturned, OnComplete};
use crate::config::AutoGrowOptions;
use crate::error::AutoBrowseError;
use crate::event::EventSender;
use crate::render::Renderer;
use crate::store::{KeyValueStore, SqliteStore};
use crate::surface::{Container, Viewport};
use crate::transport::{HttpTransport, Transport};

/// Builder for constructing an [`AutoGrow`] session.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use autobrowse::{AutoGrow, BufferContainer, TailViewport, TemplateRenderer, items_at};
/// # async fn example() -> Result<(), autobrowse::AutoBrowseError> {
/// let container = Arc::new(BufferContainer::echo());
/// let viewport = Arc::new(TailViewport::new(container.clone(), 40));
///
/// let session = AutoGrow::builder("https://example.com/items")
///     .count(20)
///     .total_count(200)
///     .renderer(TemplateRenderer::new("<li>{{ name }}</li>").with_items_pointer("/items"))
///     .items_returned(items_at("/items"))
///     .container(container)
///     .viewport(viewport)
///     .build()?;
///
/// let (tx, rx) = tokio::sync::mpsc::channel(16);
/// tx.send(autobrowse::ScrollSignal).await.ok();
/// let report = session.run(rx).await?;
/// println!("fetched {} items", report.offset);
/// # Ok(())
/// # }
/// ```
pub struct AutoGrowBuilder {
    url: String,
    options: AutoGrowOptions,
    transport: Option<Arc<dyn Transport>>,
    renderer: Option<Arc<dyn Renderer>>,
    container: Option<Arc<dyn Container>>,
    viewport: Option<Arc<dyn Viewport>>,
    store: Option<Arc<dyn KeyValueStore>>,
    items_returned: Option<ItemsReturned>,
    on_complete: Option<OnComplete>,
    events: EventSender,
}

impl AutoGrowBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            options: AutoGrowOptions::default(),
            transport: None,
            renderer: None,
            container: None,
            viewport: None,
            store: None,
            items_returned: None,
            on_complete: None,
            events: EventSender::noop(),
        }
    }

    /// Replace all options at once
    pub fn options(mut self, options: AutoGrowOptions) -> Self {
        self.options = options;
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.options.offset = offset;
        self
    }

    pub fn count(mut self, count: u64) -> Self {
        self.options.count = count;
        self
    }

    pub fn total_count(mut self, total_count: u64) -> Self {
        self.options.total_count = total_count;
        self
    }

    pub fn loader(mut self, markup: impl Into<String>) -> Self {
        self.options.loader = markup.into();
        self
    }

    pub fn use_storage(mut self, enabled: bool) -> Self {
        self.options.use_storage = enabled;
        self
    }

    /// Prefix of the persisted keys; sessions with different namespaces
    /// persist independently
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.options.namespace = namespace.into();
        self
    }

    /// Set a custom transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Use the HTTP transport with a custom request timeout.
    pub fn http_transport(mut self, timeout: Duration) -> Result<Self, AutoBrowseError> {
        self.transport = Some(Arc::new(HttpTransport::with_timeout(timeout)?));
        Ok(self)
    }

    pub fn renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Arc::new(renderer));
        self
    }

    pub fn container(mut self, container: Arc<dyn Container>) -> Self {
        self.container = Some(container);
        self
    }

    pub fn viewport(mut self, viewport: Arc<dyn Viewport>) -> Self {
        self.viewport = Some(viewport);
        self
    }

    /// Set the store used when `use_storage` is enabled.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Persist into a SQLite database at `path`.
    pub fn sqlite_store(mut self, path: impl Into<PathBuf>) -> Result<Self, AutoBrowseError> {
        let store = SqliteStore::new(path).map_err(AutoBrowseError::storage)?;
        self.store = Some(Arc::new(store));
        Ok(self)
    }

    /// How many items a page carries. Required.
    pub fn items_returned(mut self, count: ItemsReturned) -> Self {
        self.items_returned = Some(count);
        self
    }

    /// Same as [`items_returned`](Self::items_returned) for a plain closure.
    pub fn items_returned_fn(
        self,
        count: impl Fn(&Value) -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.items_returned(Arc::new(count))
    }

    /// Called with each page after it was rendered.
    pub fn on_complete(mut self, callback: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(callback));
        self
    }

    /// Send session events to this sender.
    pub fn events(mut self, events: EventSender) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> Result<AutoGrow, AutoBrowseError> {
        self.options.validate()?;

        let items_returned = self.items_returned.ok_or_else(|| {
            AutoBrowseError::Config("an items_returned function is required".to_string())
        })?;
        let renderer = self
            .renderer
            .ok_or_else(|| AutoBrowseError::Config("a renderer is required".to_string()))?;
        let container = self
            .container
            .ok_or_else(|| AutoBrowseError::Config("a container is required".to_string()))?;
        let viewport = self
            .viewport
            .ok_or_else(|| AutoBrowseError::Config("a viewport is required".to_string()))?;

        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let cache = if self.options.use_storage {
            let store = self.store.ok_or_else(|| {
                AutoBrowseError::Config("use_storage requires a store".to_string())
            })?;
            Some(PageCache::new(
                store,
                &self.options.namespace,
                self.options.offset,
            ))
        } else {
            if self.store.is_some() {
                debug!("store configured but use_storage is off, ignoring it");
            }
            None
        };

        let on_complete: OnComplete = match self.on_complete {
            Some(callback) => callback,
            None => Arc::new(|_: &mut Value| {}),
        };

        debug!(
            url = %self.url,
            transport = transport.name(),
            use_storage = cache.is_some(),
            events = self.events.is_active(),
            "built session"
        );

        Ok(AutoGrow::new(
            self.url,
            self.options,
            transport,
            renderer,
            container,
            viewport,
            items_returned,
            on_complete,
            cache,
            self.events,
        ))
    }
}
