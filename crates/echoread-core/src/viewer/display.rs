//! Display surface the controller renders into.

use serde::Serialize;

use super::text::page_indicator_label;
use crate::pdf::RasterSurface;

/// Output side of the viewer: a text layer, a raster layer, a status line,
/// a page indicator and the two navigation controls.
///
/// Showing one layer hides the other.
pub trait DisplaySurface: Send {
    /// Show HTML-safe text and hide the raster layer.
    fn show_text(&mut self, html: &str);

    /// Show the raster surface and hide the text layer.
    fn show_raster(&mut self, surface: &RasterSurface);

    /// Replace the status line.
    fn set_status(&mut self, message: &str);

    /// Update the page indicator.
    fn set_page_indicator(&mut self, current: u32, total: u32);

    /// Enable or disable the navigation controls.
    fn set_nav_enabled(&mut self, previous: bool, next: bool);

    /// Reset the scroll position to the top.
    fn scroll_to_top(&mut self);

    /// Replace the whole view with a fatal error.
    fn show_fatal(&mut self, message: &str);
}

/// Which content layer is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibleLayer {
    /// Nothing shown yet.
    #[default]
    None,
    /// Text layer.
    Text,
    /// Raster layer.
    Raster,
    /// Full-page fatal error.
    Fatal,
}

/// What the raster layer currently shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RasterPreview {
    pub page: Option<u32>,
    pub width: u32,
    pub height: u32,
}

/// In-memory display that records the visible state.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotDisplay {
    pub visible: VisibleLayer,
    pub text_html: String,
    pub raster: Option<RasterPreview>,
    pub status: String,
    pub status_history: Vec<String>,
    pub page_indicator: String,
    pub nav_previous: bool,
    pub nav_next: bool,
    pub scroll_resets: u32,
    pub fatal: Option<String>,
}

impl SnapshotDisplay {
    /// Create an empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible content only: layer, text, raster and indicator.
    pub fn content(&self) -> (VisibleLayer, &str, Option<RasterPreview>, &str) {
        (
            self.visible,
            &self.text_html,
            self.raster,
            &self.page_indicator,
        )
    }
}

impl DisplaySurface for SnapshotDisplay {
    fn show_text(&mut self, html: &str) {
        self.text_html = html.to_string();
        self.raster = None;
        self.visible = VisibleLayer::Text;
    }

    fn show_raster(&mut self, surface: &RasterSurface) {
        self.raster = Some(RasterPreview {
            page: surface.page(),
            width: surface.width(),
            height: surface.height(),
        });
        self.text_html.clear();
        self.visible = VisibleLayer::Raster;
    }

    fn set_status(&mut self, message: &str) {
        self.status = message.to_string();
        self.status_history.push(message.to_string());
    }

    fn set_page_indicator(&mut self, current: u32, total: u32) {
        self.page_indicator = page_indicator_label(current, total);
    }

    fn set_nav_enabled(&mut self, previous: bool, next: bool) {
        self.nav_previous = previous;
        self.nav_next = next;
    }

    fn scroll_to_top(&mut self) {
        self.scroll_resets += 1;
    }

    fn show_fatal(&mut self, message: &str) {
        self.fatal = Some(message.to_string());
        self.visible = VisibleLayer::Fatal;
        self.nav_previous = false;
        self.nav_next = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layers_are_exclusive() {
        let mut display = SnapshotDisplay::new();
        let mut surface = RasterSurface::new();
        surface.prepare(3, 2);
        surface.set_page(Some(4));

        display.show_text("hello");
        display.show_raster(&surface);
        assert_eq!(display.visible, VisibleLayer::Raster);
        assert!(display.text_html.is_empty());
        assert_eq!(
            display.raster,
            Some(RasterPreview {
                page: Some(4),
                width: 3,
                height: 2
            })
        );

        display.show_text("again");
        assert_eq!(display.visible, VisibleLayer::Text);
        assert!(display.raster.is_none());
    }
}
