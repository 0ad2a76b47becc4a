use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde_json::Value;

use super::Renderer;

/// `{{ field }}`, `{{ nested.field }}` or `{{ . }}` for the whole item
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z0-9_.\-]+)\s*\}\}").expect("valid placeholder pattern")
});

/// Renders every item of a page through a small placeholder template.
///
/// Items are taken from the array at `items_pointer` (a JSON pointer such as
/// `/items`); without a pointer the page itself is the array, or a single
/// item when it is an object. Substituted values are HTML-escaped.
#[derive(Debug, Clone)]
pub struct TemplateRenderer {
    template: String,
    items_pointer: Option<String>,
}

impl TemplateRenderer {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            items_pointer: None,
        }
    }

    /// Read items from the array at this JSON pointer
    pub fn with_items_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.items_pointer = Some(pointer.into());
        self
    }

    fn items<'a>(&self, page: &'a Value) -> Result<Vec<&'a Value>> {
        let source = match &self.items_pointer {
            Some(pointer) => page
                .pointer(pointer)
                .with_context(|| format!("page has no value at {}", pointer))?,
            None => page,
        };

        match source {
            Value::Array(items) => Ok(items.iter().collect()),
            Value::Object(_) if self.items_pointer.is_none() => Ok(vec![source]),
            other => anyhow::bail!("expected an array of items, found {}", kind(other)),
        }
    }

    fn render_item(&self, item: &Value) -> Result<String> {
        let mut out = String::with_capacity(self.template.len());
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(&self.template) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let path = path.as_str();
            out.push_str(&self.template[last..whole.start()]);

            let value = lookup(item, path)
                .with_context(|| format!("item has no field '{}'", path))?;
            out.push_str(&escape_html(&display(value)));
            last = whole.end();
        }

        out.push_str(&self.template[last..]);
        Ok(out)
    }
}

impl Renderer for TemplateRenderer {
    fn render(&self, page: &Value) -> Result<String> {
        let rendered = self
            .items(page)?
            .into_iter()
            .map(|item| self.render_item(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(rendered.join("\n"))
    }
}

fn lookup<'a>(item: &'a Value, path: &str) -> Option<&'a Value> {
    if path == "." {
        return Some(item);
    }
    path.split('.').try_fold(item, |value, segment| match value {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
