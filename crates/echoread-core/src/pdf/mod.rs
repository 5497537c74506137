//! PDF document access: opening documents, per-page text and rasterization.

mod extractor;
mod source;
mod surface;

pub use extractor::{LopdfDocument, LopdfPage, LopdfProvider};
pub use source::{FetchProgress, Fetcher, Locator, ProgressFn};
pub use surface::RasterSurface;

use async_trait::async_trait;

use crate::error::{DocumentLoadError, PageAccessError};

/// A run of extracted page text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    /// Text content of the run.
    pub text: String,
    /// Whether a line break follows this run.
    pub ends_line: bool,
}

impl TextRun {
    /// Create a run followed by a line break.
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ends_line: true,
        }
    }

    /// Create a run that continues on the same line.
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ends_line: false,
        }
    }
}

/// Opens documents from a locator (path or URL).
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    /// Open the document at `locator`.
    async fn open(&self, locator: &str) -> Result<Box<dyn DocumentHandle>, DocumentLoadError>;
}

/// A loaded multi-page document.
#[async_trait]
pub trait DocumentHandle: Send + Sync {
    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Get a page by its 1-based index.
    async fn page(&self, index: u32) -> Result<Box<dyn PageHandle>, PageAccessError>;
}

/// A single page, able to produce its text layer and a raster image.
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// 1-based page index.
    fn number(&self) -> u32;

    /// Extract the page's text runs in reading order.
    async fn text_runs(&self) -> Result<Vec<TextRun>, PageAccessError>;

    /// Render the page into `surface` at the given magnification.
    async fn render(&self, surface: &mut RasterSurface, scale: f32) -> Result<(), PageAccessError>;
}
