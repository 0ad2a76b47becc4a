mod template;

pub use template::TemplateRenderer;

use anyhow::Result;
use serde_json::Value;

/// Turns one fetched page into markup for the container.
///
/// Rendering may fail; the controller reports the failure and keeps counting
/// the page, so implementations never need to recover on their own.
pub trait Renderer: Send + Sync {
    fn render(&self, page: &Value) -> Result<String>;
}

impl<F> Renderer for F
where
    F: Fn(&Value) -> Result<String> + Send + Sync,
{
    fn render(&self, page: &Value) -> Result<String> {
        self(page)
    }
}
