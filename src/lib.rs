pub mod config;
pub mod cursor;
pub mod error;
pub mod event;
pub mod render;
pub mod session;
pub mod store;
pub mod surface;
pub mod transport;

pub use config::{AutoGrowOptions, ProjectConfig};
pub use cursor::PagingCursor;
pub use error::AutoBrowseError;
pub use event::{Event, EventSender};
pub use render::{Renderer, TemplateRenderer};
pub use session::{
    AutoGrow, AutoGrowBuilder, CacheKeys, ItemsReturned, OnComplete, PageCache, SessionPhase,
    SessionReport, items_at,
};
pub use store::{KeyValueStore, MemoryStore, SqliteStore};
pub use surface::{BufferContainer, Container, ScrollMetrics, ScrollSignal, TailViewport, Viewport};
pub use transport::{HttpTransport, PageRequest, Transport};
