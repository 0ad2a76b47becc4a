use serde::{Deserialize, Serialize};

use crate::error::AutoBrowseError;

pub const DEFAULT_COUNT: u64 = 20;
pub const DEFAULT_LOADER: &str = r#"<div class="loader"></div>"#;
pub const DEFAULT_NAMESPACE: &str = "autogrow";
pub const DEFAULT_SCROLL_SAVE_DELAY_MS: u64 = 200;

/// Attach-time options of one session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoGrowOptions {
    /// Offset of the first request
    pub offset: u64,

    /// Items requested per page
    pub count: u64,

    /// Items available on the server; 0 stops after the first page
    pub total_count: u64,

    /// Markup shown while a request is outstanding
    pub loader: String,

    /// Persist fetched pages and scroll position across reloads
    pub use_storage: bool,

    /// Prefix of the persisted keys
    pub namespace: String,

    /// Quiet period before the scroll position is persisted
    pub scroll_save_delay_ms: u64,
}

impl Default for AutoGrowOptions {
    fn default() -> Self {
        Self {
            offset: 0,
            count: DEFAULT_COUNT,
            total_count: 0,
            loader: DEFAULT_LOADER.to_string(),
            use_storage: false,
            namespace: DEFAULT_NAMESPACE.to_string(),
            scroll_save_delay_ms: DEFAULT_SCROLL_SAVE_DELAY_MS,
        }
    }
}

impl AutoGrowOptions {
    pub fn validate(&self) -> Result<(), AutoBrowseError> {
        if self.count == 0 {
            return Err(AutoBrowseError::Config(
                "count must be at least 1".to_string(),
            ));
        }
        if self.use_storage && self.namespace.trim().is_empty() {
            return Err(AutoBrowseError::Config(
                "namespace must not be empty when use_storage is set".to_string(),
            ));
        }
        Ok(())
    }
}
