//! The visible side of a session: the scrolling viewport and the container
//! that grows inside it.
//!
//! Both are read and written from the controller's task only; implementations
//! use interior mutability so the controller can hold them behind `Arc`.

mod buffer;

pub use buffer::{BufferContainer, TailViewport};

/// Notification that the viewport scrolled.
///
/// Carries no payload: the controller reads fresh geometry from the
/// [`Viewport`] and [`Container`] when it handles the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollSignal;

/// Scrollable window the container is displayed in
pub trait Viewport: Send + Sync {
    /// Current vertical scroll offset
    fn scroll_top(&self) -> u64;

    /// Visible height
    fn height(&self) -> u64;

    /// Scroll to an absolute offset
    fn set_scroll_top(&self, top: u64);
}

/// Element that receives rendered pages
pub trait Container: Send + Sync {
    /// Append rendered markup after the existing content
    fn append(&self, markup: &str);

    /// Show the loading indicator at the end of the content
    fn insert_loader(&self, markup: &str);

    /// Remove the loading indicator, if shown
    fn remove_loader(&self);

    /// Distance from the top of the document to the container
    fn offset_top(&self) -> u64;

    /// Current height of the container
    fn height(&self) -> u64;
}

/// Snapshot of viewport and container geometry taken for one scroll signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollMetrics {
    pub scroll_top: u64,
    pub viewport_height: u64,
    pub container_top: u64,
    pub container_height: u64,
}

impl ScrollMetrics {
    pub fn capture(viewport: &dyn Viewport, container: &dyn Container) -> Self {
        Self {
            scroll_top: viewport.scroll_top(),
            viewport_height: viewport.height(),
            container_top: container.offset_top(),
            container_height: container.height(),
        }
    }

    pub fn container_bottom(&self) -> u64 {
        self.container_top.saturating_add(self.container_height)
    }

    pub fn viewport_bottom(&self) -> u64 {
        self.scroll_top.saturating_add(self.viewport_height)
    }

    /// Whether the container's bottom edge has scrolled into view
    pub fn bottom_in_view(&self) -> bool {
        self.container_bottom() < self.viewport_bottom()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(scroll_top: u64, container_height: u64) -> ScrollMetrics {
        ScrollMetrics {
            scroll_top,
            viewport_height: 600,
            container_top: 100,
            container_height,
        }
    }

    #[test]
    fn test_bottom_in_view() {
        // container ends at 1100, viewport bottom at 600
        assert!(!metrics(0, 1000).bottom_in_view());
        // viewport bottom exactly on the edge is not enough
        assert!(!metrics(500, 1000).bottom_in_view());
        assert!(metrics(501, 1000).bottom_in_view());
    }

    #[test]
    fn test_short_container_is_always_in_view() {
        assert!(metrics(0, 0).bottom_in_view());
    }
}
