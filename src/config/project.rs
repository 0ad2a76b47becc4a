use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::AutoGrowOptions;

/// File looked up in the working directory when no path is given
pub const CONFIG_FILE_NAME: &str = "autobrowse.toml";

/// Project-level configuration for the `autobrowse` binary
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Endpoint pages are fetched from
    #[serde(default)]
    pub url: Option<String>,

    /// Session options
    #[serde(default)]
    pub options: AutoGrowOptions,

    /// How pages are turned into markup
    #[serde(default)]
    pub render: RenderConfig,

    /// Where persisted pages live
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Placeholder template applied to each item
    #[serde(default)]
    pub template: Option<String>,

    /// JSON pointer to the item array inside a page
    #[serde(default)]
    pub items_pointer: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path, defaults to ~/.autobrowse/storage.db
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Byte budget for persisted keys and values
    #[serde(default)]
    pub quota_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ProjectConfig {
    /// Load `autobrowse.toml` from the working directory, or defaults if absent
    pub fn load() -> Result<Self> {
        let path = Path::new(CONFIG_FILE_NAME);
        if !path.exists() {
            debug!("no {} found, using defaults", CONFIG_FILE_NAME);
            return Ok(Self::default());
        }
        Self::load_from(path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self =
            toml::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}
