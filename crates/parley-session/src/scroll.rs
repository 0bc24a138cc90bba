//! Scroll-driven pagination and scroll anchoring.
//!
//! The coordinator is renderer-agnostic: callers feed it viewport
//! measurements and apply the offsets it returns. The anchor dance for a
//! prepend is:
//!
//! 1. [`ScrollCoordinator::capture_anchor`] before the older page is applied;
//! 2. apply the page and let the renderer lay out the new entries;
//! 3. [`ScrollCoordinator::restore_anchor`] after layout but before the next
//!    paint, and set the returned scroll offset.
//!
//! Restoring earlier measures the old layout; restoring later shows one
//! frame at the wrong offset.

use tracing::debug;

use crate::config::SessionConfig;

/// Measurements of the scrolling message container, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Distance scrolled from the top of the content
    pub scroll_top: f64,
    /// Total height of the content
    pub scroll_height: f64,
    /// Visible height
    pub client_height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ScrollAnchor {
    scroll_top: f64,
    scroll_height: f64,
}

#[derive(Debug, Clone)]
pub struct ScrollCoordinator {
    top_threshold_px: f64,
    anchor: Option<ScrollAnchor>,
}

impl ScrollCoordinator {
    pub fn new(top_threshold_px: f64) -> Self {
        Self {
            top_threshold_px: top_threshold_px.max(0.0),
            anchor: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.scroll_top_threshold_px)
    }

    /// Whether an older page should be requested now.
    ///
    /// `can_paginate` is the session's own gate (room active, more history,
    /// no fetch in flight). On top of it the viewport must be near the top,
    /// or the content must not fill the viewport yet.
    pub fn should_request_older(&self, viewport: &Viewport, can_paginate: bool) -> bool {
        if !can_paginate || self.anchor.is_some() {
            return false;
        }
        let near_top = viewport.scroll_top <= self.top_threshold_px;
        let underfilled = viewport.scroll_height <= viewport.client_height;
        near_top || underfilled
    }

    /// Remember the layout right before a prepend.
    pub fn capture_anchor(&mut self, viewport: &Viewport) {
        self.anchor = Some(ScrollAnchor {
            scroll_top: viewport.scroll_top,
            scroll_height: viewport.scroll_height,
        });
    }

    /// Scroll offset that keeps the previously visible content in place,
    /// given the layout after the prepend. Returns `None` without an anchor.
    pub fn restore_anchor(&mut self, after_layout: &Viewport) -> Option<f64> {
        let anchor = self.anchor.take()?;
        let added = after_layout.scroll_height - anchor.scroll_height;
        let scroll_top = (anchor.scroll_top + added).max(0.0);
        debug!(added, scroll_top, "Restored scroll anchor");
        Some(scroll_top)
    }

    /// Drop a captured anchor (room switch, failed or empty fetch).
    pub fn cancel(&mut self) {
        self.anchor = None;
    }
}
