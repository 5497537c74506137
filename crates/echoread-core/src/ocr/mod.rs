//! OCR engine abstraction and the lazily acquired engine slot.

#[cfg(feature = "native")]
mod pure_engine;
mod slot;

#[cfg(feature = "native")]
pub use pure_engine::{PureOcrEngine, PureOcrFactory};
pub use slot::{EngineSlot, EngineState};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::pdf::RasterSurface;

/// Creates OCR engine handles.
///
/// Called at most once per viewing session.
#[async_trait]
pub trait OcrEngineFactory: Send + Sync {
    /// Construct an engine; it still needs its language resource and
    /// initialization before it can recognize anything.
    async fn create(&self, config: &OcrConfig) -> Result<Box<dyn OcrEngineHandle>, OcrError>;
}

/// A constructed OCR engine.
#[async_trait]
pub trait OcrEngineHandle: Send + Sync {
    /// Load the trained data for a language.
    async fn load_language_resource(&mut self, locator: &str) -> Result<(), OcrError>;

    /// Prepare the engine for the given language tag.
    async fn initialize(&mut self, language: &str) -> Result<(), OcrError>;

    /// Recognize the text drawn on `surface`.
    async fn recognize(&self, surface: &RasterSurface) -> Result<OcrResult, OcrError>;

    /// Release engine resources.
    async fn terminate(&mut self) {}
}

/// A detected text box with its coordinates and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextBox {
    /// Bounding box coordinates (x1, y1, x2, y2, x3, y3, x4, y4) for quadrilateral.
    pub bbox: [f32; 8],

    /// Recognized text content.
    pub text: String,

    /// Recognition confidence score (0.0 - 1.0).
    pub confidence: f32,
}

impl TextBox {
    /// Get the axis-aligned bounding rectangle.
    pub fn rect(&self) -> (f32, f32, f32, f32) {
        let xs = [self.bbox[0], self.bbox[2], self.bbox[4], self.bbox[6]];
        let ys = [self.bbox[1], self.bbox[3], self.bbox[5], self.bbox[7]];

        let min_x = xs.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_x = xs.iter().cloned().fold(f32::NEG_INFINITY, f32::max);
        let min_y = ys.iter().cloned().fold(f32::INFINITY, f32::min);
        let max_y = ys.iter().cloned().fold(f32::NEG_INFINITY, f32::max);

        (min_x, min_y, max_x, max_y)
    }
}

/// Result of OCR processing on a surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrResult {
    /// Detected and recognized text boxes.
    pub boxes: Vec<TextBox>,

    /// Full text (boxes joined with newlines).
    pub text: String,

    /// Processing time in milliseconds.
    pub processing_time_ms: u64,

    /// Image dimensions (width, height).
    pub image_size: (u32, u32),
}

impl OcrResult {
    /// A result carrying only plain text, without box geometry.
    pub fn from_text(text: impl Into<String>, image_size: (u32, u32)) -> Self {
        Self {
            boxes: Vec::new(),
            text: text.into(),
            processing_time_ms: 0,
            image_size,
        }
    }

    /// Sort boxes by reading order (top-to-bottom, left-to-right) and
    /// rebuild `text` from them.
    pub fn sort_by_reading_order(&mut self) {
        self.boxes.sort_by(|a, b| {
            let (ax, ay, _, _) = a.rect();
            let (bx, by, _, _) = b.rect();

            // Rows are 20px bands.
            let row_a = (ay / 20.0) as i32;
            let row_b = (by / 20.0) as i32;

            row_a
                .cmp(&row_b)
                .then(ax.partial_cmp(&bx).unwrap_or(std::cmp::Ordering::Equal))
        });

        self.text = self
            .boxes
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
    }
}
