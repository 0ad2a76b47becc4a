use std::sync::Arc;

use anyhow::Result;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::store::KeyValueStore;

/// Names of the persisted keys of one namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeys {
    /// Last persisted viewport offset
    pub scroll_top: String,
    /// URL the cached pages belong to
    pub owner: String,
    /// Offset reached by the session that wrote the cache
    pub offset: String,
    /// The cached pages
    pub pages: String,
}

impl CacheKeys {
    pub fn new(namespace: &str) -> Self {
        Self {
            scroll_top: format!("{}ScrollTop", namespace),
            owner: format!("{}StorageKey", namespace),
            offset: format!("{}Offset", namespace),
            pages: format!("{}Storage", namespace),
        }
    }

    pub fn all(&self) -> [&str; 4] {
        [&self.scroll_top, &self.owner, &self.offset, &self.pages]
    }
}

/// Mirror of a session's fetched pages in a [`KeyValueStore`].
///
/// The cached pages start at `base_offset` and stay a gapless prefix of
/// everything fetched until a write fails. After that the cache is marked
/// incomplete and only the pages that made it in are replayed on reload.
pub struct PageCache {
    store: Arc<dyn KeyValueStore>,
    keys: CacheKeys,
    base_offset: u64,
    pages: Vec<Value>,
    cached_items: u64,
    complete: bool,
}

impl PageCache {
    pub fn new(store: Arc<dyn KeyValueStore>, namespace: &str, base_offset: u64) -> Self {
        Self {
            store,
            keys: CacheKeys::new(namespace),
            base_offset,
            pages: Vec::new(),
            cached_items: 0,
            complete: true,
        }
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    /// Pages currently held in the cache
    pub fn pages(&self) -> &[Value] {
        &self.pages
    }

    /// Items covered by the cached pages
    pub fn cached_items(&self) -> u64 {
        self.cached_items
    }

    /// False once a page was fetched but could not be cached
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Record that a page was shown without being cached
    pub fn mark_incomplete(&mut self) {
        self.complete = false;
    }

    /// Whether a page fetched at `offset` would extend the cache without a gap
    pub fn is_contiguous_with(&self, offset: u64) -> bool {
        self.base_offset + self.cached_items == offset
    }

    /// URL the persisted state belongs to
    pub async fn owner(&self) -> Result<Option<String>> {
        let owner = self.store.get(&self.keys.owner).await?;
        Ok(owner.and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Persisted pages, `None` if nothing was ever initialized
    pub async fn stored_pages(&self) -> Result<Option<Vec<Value>>> {
        match self.store.get(&self.keys.pages).await? {
            Some(Value::Array(pages)) => Ok(Some(pages)),
            Some(other) => {
                warn!(key = %self.keys.pages, found = %other, "ignoring malformed page cache");
                Ok(None)
            }
            None => Ok(None),
        }
    }

    pub async fn stored_offset(&self) -> Result<Option<u64>> {
        Ok(self
            .store
            .get(&self.keys.offset)
            .await?
            .and_then(|v| v.as_u64()))
    }

    pub async fn stored_scroll_top(&self) -> Result<Option<u64>> {
        Ok(self
            .store
            .get(&self.keys.scroll_top)
            .await?
            .and_then(|v| v.as_u64()))
    }

    /// Remove every persisted key of this namespace and forget cached pages
    pub async fn reset(&mut self) -> Result<()> {
        for key in self.keys.all() {
            self.store.remove(key).await?;
        }
        self.pages.clear();
        self.cached_items = 0;
        self.complete = true;
        debug!(namespace_key = %self.keys.owner, "reset page cache");
        Ok(())
    }

    /// Write fresh state for `url` starting at `offset`.
    ///
    /// Returns false if the store refused any of the writes.
    pub async fn initialize(&mut self, url: &str, offset: u64) -> Result<bool> {
        self.pages.clear();
        self.cached_items = 0;
        self.complete = true;

        let writes = [
            (&self.keys.offset, json!(offset)),
            (&self.keys.owner, json!(url)),
            (&self.keys.pages, json!([])),
            (&self.keys.scroll_top, json!(0)),
        ];

        let mut stored = true;
        for (key, value) in writes {
            stored &= self.store.set(key, &value).await?;
        }
        Ok(stored)
    }

    /// Adopt pages that were replayed from the store
    pub fn restore(&mut self, pages: Vec<Value>, items: u64, complete: bool) {
        self.pages = pages;
        self.cached_items = items;
        self.complete = complete;
    }

    /// Append a page and persist the whole cache.
    ///
    /// When the store refuses the write, the page is dropped from the cache
    /// again and the cache is marked incomplete; returns false in that case.
    pub async fn append(&mut self, page: Value, items: u64) -> bool {
        self.pages.push(page);
        let snapshot = Value::Array(self.pages.clone());

        match self.store.set(&self.keys.pages, &snapshot).await {
            Ok(true) => {
                self.cached_items += items;
                return true;
            }
            Ok(false) => {
                warn!(pages = self.pages.len(), "page cache full, dropping page");
            }
            Err(e) => {
                warn!(error = %e, "failed to persist page cache, dropping page");
            }
        }

        self.pages.pop();
        self.complete = false;
        false
    }

    pub async fn save_offset(&self, offset: u64) -> Result<bool> {
        self.store.set(&self.keys.offset, &json!(offset)).await
    }

    pub async fn save_scroll_top(&self, top: u64) -> Result<bool> {
        self.store.set(&self.keys.scroll_top, &json!(top)).await
    }
}
