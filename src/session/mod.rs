mod builder;
mod cache;
mod controller;
mod hooks;
mod monitor;

pub use builder::AutoGrowBuilder;
pub use cache::{CacheKeys, PageCache};
pub use controller::{AutoGrow, SessionPhase, SessionReport};
pub use hooks::{ItemsReturned, OnComplete, items_at};
