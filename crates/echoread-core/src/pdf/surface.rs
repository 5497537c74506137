//! Reusable pixel buffer shared by the rasterizer and the OCR engine.

use image::{DynamicImage, Rgba, RgbaImage};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Single reusable RGBA buffer a scanned page is drawn into.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    buffer: RgbaImage,
    page: Option<u32>,
}

impl RasterSurface {
    /// Create an empty surface.
    pub fn new() -> Self {
        Self {
            buffer: RgbaImage::new(0, 0),
            page: None,
        }
    }

    /// Resize to `width` x `height` and clear to white.
    ///
    /// The allocation is kept when the dimensions do not change.
    pub fn prepare(&mut self, width: u32, height: u32) {
        if self.buffer.dimensions() != (width, height) {
            self.buffer = RgbaImage::from_pixel(width, height, WHITE);
        } else {
            self.buffer.pixels_mut().for_each(|p| *p = WHITE);
        }
        self.page = None;
    }

    /// Surface width in pixels.
    pub fn width(&self) -> u32 {
        self.buffer.width()
    }

    /// Surface height in pixels.
    pub fn height(&self) -> u32 {
        self.buffer.height()
    }

    /// Page currently drawn on the surface, if any.
    pub fn page(&self) -> Option<u32> {
        self.page
    }

    /// Record which page the surface now holds.
    pub fn set_page(&mut self, page: Option<u32>) {
        self.page = page;
    }

    /// Whether the surface holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.buffer.width() == 0 || self.buffer.height() == 0
    }

    /// Borrow the pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.buffer
    }

    /// Mutably borrow the pixel buffer.
    pub fn pixels_mut(&mut self) -> &mut RgbaImage {
        &mut self.buffer
    }

    /// Copy `scaled` onto the surface at the origin.
    pub fn draw_scaled(&mut self, scaled: &RgbaImage) {
        if self.is_empty() {
            return;
        }
        image::imageops::overlay(&mut self.buffer, scaled, 0, 0);
    }

    /// Copy the surface into an owned image.
    pub fn to_image(&self) -> DynamicImage {
        DynamicImage::ImageRgba8(self.buffer.clone())
    }

    /// Free the pixel buffer.
    pub fn release(&mut self) {
        self.buffer = RgbaImage::new(0, 0);
        self.page = None;
    }
}

/// Stretch `image` to exactly `width` x `height`.
pub fn stretch(image: &DynamicImage, width: u32, height: u32) -> RgbaImage {
    image::imageops::resize(
        &image.to_rgba8(),
        width,
        height,
        image::imageops::FilterType::Triangle,
    )
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new()
    }
}
