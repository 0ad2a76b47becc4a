mod http;

pub use http::{DEFAULT_TIMEOUT_SECS, HttpTransport};

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// One paged fetch: `count` items starting at `offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub offset: u64,
    pub count: u64,
}

impl PageRequest {
    pub fn new(offset: u64, count: u64) -> Self {
        Self { offset, count }
    }

    /// Endpoint for this page under `base_url`, i.e. `{base_url}/{offset}/{count}`
    pub fn endpoint(&self, base_url: &str) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.offset,
            self.count
        )
    }
}

/// Source of pages for an attached container
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one page from `url`. The response shape is opaque to the caller.
    async fn fetch(&self, url: &str, request: PageRequest) -> Result<Value>;

    /// Get the transport name
    fn name(&self) -> &str;
}
