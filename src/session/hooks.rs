use std::sync::Arc;

use serde_json::Value;

/// Number of items a fetched page carries
pub type ItemsReturned = Arc<dyn Fn(&Value) -> u64 + Send + Sync>;

/// Called with every page after it was rendered and before it is persisted,
/// so it may rewrite the page that ends up in the cache
pub type OnComplete = Arc<dyn Fn(&mut Value) + Send + Sync>;

/// Count the items of the array at `pointer` (`""` for the page itself).
/// Pages without an array there count as empty.
pub fn items_at(pointer: impl Into<String>) -> ItemsReturned {
    let pointer = pointer.into();
    Arc::new(move |page: &Value| {
        page.pointer(&pointer)
            .and_then(Value::as_array)
            .map_or(0, |items| items.len() as u64)
    })
}
