use crate::transport::PageRequest;

/// Pagination position of one attached container.
///
/// `current` only ever moves forward, by the item count reported for each
/// page, so it never drops below `base`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingCursor {
    base: u64,
    current: u64,
    page_size: u64,
    total: u64,
}

impl PagingCursor {
    pub fn new(offset: u64, page_size: u64, total: u64) -> Self {
        Self {
            base: offset,
            current: offset,
            page_size,
            total,
        }
    }

    /// Offset the session started from
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of items fetched so far, counted from zero
    pub fn current(&self) -> u64 {
        self.current
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    /// Whether the server may still have items past the cursor.
    ///
    /// Inclusive on purpose: a cursor sitting exactly on `total` still asks
    /// once, and the empty answer ends the session.
    pub fn has_more(&self) -> bool {
        self.current <= self.total
    }

    /// Whether a page reporting `items` is the last one worth asking for
    pub fn is_final_page(&self, items: u64) -> bool {
        items == 0 || self.current.saturating_add(items) >= self.total
    }

    /// Request for the next full page
    pub fn next_request(&self) -> PageRequest {
        PageRequest::new(self.current, self.page_size)
    }

    /// Move past `items` freshly fetched items
    pub fn advance(&mut self, items: u64) {
        self.current = self.current.saturating_add(items);
    }
}
