mod options;
mod project;

pub use options::{
    AutoGrowOptions, DEFAULT_COUNT, DEFAULT_LOADER, DEFAULT_NAMESPACE,
    DEFAULT_SCROLL_SAVE_DELAY_MS,
};
pub use project::{CONFIG_FILE_NAME, HttpConfig, ProjectConfig, RenderConfig, StorageConfig};
