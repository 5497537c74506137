//! PDF page access using lopdf, with pdf-extract as a text fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use image::{DynamicImage, ImageBuffer, Rgba};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, trace};

use super::source::{Fetcher, Locator};
use super::surface::stretch;
use super::{DocumentHandle, DocumentProvider, PageHandle, RasterSurface, TextRun};
use crate::error::{DocumentLoadError, PageAccessError};

/// US Letter, used when a page carries no MediaBox.
const DEFAULT_MEDIA_BOX: (f32, f32) = (612.0, 792.0);

/// Largest raster edge, in pixels.
const MAX_RASTER_EDGE: f32 = 8192.0;

/// Document provider backed by lopdf.
#[derive(Debug, Clone)]
pub struct LopdfProvider {
    fetcher: Fetcher,
}

impl LopdfProvider {
    /// Create a provider reading documents through `fetcher`.
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }
}

#[async_trait]
impl DocumentProvider for LopdfProvider {
    async fn open(&self, locator: &str) -> Result<Box<dyn DocumentHandle>, DocumentLoadError> {
        let locator = Locator::parse(locator)?;
        let data = self.fetcher.fetch(&locator).await?;
        let document = LopdfDocument::from_bytes(data)?;
        info!("Opened {} ({} pages)", locator, document.page_count());
        Ok(Box::new(document))
    }
}

/// A parsed PDF document.
#[derive(Debug, Clone)]
pub struct LopdfDocument {
    doc: Arc<Document>,
    raw_data: Arc<Vec<u8>>,
    pages: BTreeMap<u32, ObjectId>,
}

impl LopdfDocument {
    /// Parse a document from its bytes.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, DocumentLoadError> {
        let mut doc =
            Document::load_mem(&data).map_err(|e| DocumentLoadError::Parse(e.to_string()))?;

        // Empty-password encryption is common for "protected" but readable files.
        let raw_data = if doc.is_encrypted() {
            if doc.decrypt("").is_err() {
                return Err(DocumentLoadError::Encrypted);
            }
            debug!("Decrypted PDF with empty password");

            let mut decrypted = Vec::new();
            doc.save_to(&mut decrypted).map_err(|e| {
                DocumentLoadError::Parse(format!("failed to save decrypted PDF: {}", e))
            })?;
            decrypted
        } else {
            data
        };

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(DocumentLoadError::NoPages);
        }

        debug!("Loaded PDF with {} pages", pages.len());
        Ok(Self {
            doc: Arc::new(doc),
            raw_data: Arc::new(raw_data),
            pages,
        })
    }
}

#[async_trait]
impl DocumentHandle for LopdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn page(&self, index: u32) -> Result<Box<dyn PageHandle>, PageAccessError> {
        let id = *self.pages.get(&index).ok_or(PageAccessError::OutOfRange {
            requested: index,
            page_count: self.page_count(),
        })?;

        Ok(Box::new(LopdfPage {
            doc: Arc::clone(&self.doc),
            raw_data: Arc::clone(&self.raw_data),
            number: index,
            id,
        }))
    }
}

/// One page of a [`LopdfDocument`].
#[derive(Debug, Clone)]
pub struct LopdfPage {
    doc: Arc<Document>,
    raw_data: Arc<Vec<u8>>,
    number: u32,
    id: ObjectId,
}

impl LopdfPage {
    fn extract_text(&self) -> Result<String, PageAccessError> {
        match self.doc.extract_text(&[self.number]) {
            Ok(text) => Ok(text),
            Err(lopdf_err) => {
                debug!(
                    "lopdf text extraction failed on page {}: {}, trying pdf-extract",
                    self.number, lopdf_err
                );
                let pages = pdf_extract::extract_text_from_mem_by_pages(&self.raw_data).map_err(
                    |e| PageAccessError::TextExtraction {
                        page: self.number,
                        reason: e.to_string(),
                    },
                )?;
                Ok(pages
                    .into_iter()
                    .nth((self.number - 1) as usize)
                    .unwrap_or_default())
            }
        }
    }

    /// Page size in points, following MediaBox inheritance.
    fn media_box(&self) -> (f32, f32) {
        let rect = self
            .inherited_entry(self.id, b"MediaBox")
            .and_then(|obj| match obj {
                Object::Array(values) if values.len() == 4 => {
                    let nums: Vec<f32> = values.iter().filter_map(as_number).collect();
                    (nums.len() == 4).then(|| ((nums[2] - nums[0]).abs(), (nums[3] - nums[1]).abs()))
                }
                _ => None,
            });

        match rect {
            Some((w, h)) if w > 0.0 && h > 0.0 => (w, h),
            _ => DEFAULT_MEDIA_BOX,
        }
    }

    /// Look up `key` on a page node or its ancestors.
    fn inherited_entry(&self, node_id: ObjectId, key: &[u8]) -> Option<Object> {
        let dict = self.doc.get_object(node_id).ok()?.as_dict().ok()?;

        if let Ok(value) = dict.get(key) {
            if let Ok((_, resolved)) = self.doc.dereference(value) {
                return Some(resolved.clone());
            }
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => self.inherited_entry(*parent_id, key),
            _ => None,
        }
    }

    fn resources(&self) -> Option<Dictionary> {
        match self.inherited_entry(self.id, b"Resources")? {
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Decodable image XObjects placed on this page.
    fn page_images(&self) -> Vec<DynamicImage> {
        let mut images = Vec::new();

        let Some(resources) = self.resources() else {
            return images;
        };
        let Ok(xobjects) = resources.get(b"XObject") else {
            return images;
        };
        let Ok((_, Object::Dictionary(xobj_dict))) = self.doc.dereference(xobjects) else {
            return images;
        };

        for (_name, obj_ref) in xobj_dict.iter() {
            if let Ok((_, obj)) = self.doc.dereference(obj_ref) {
                if let Some(img) = self.decode_image(obj) {
                    images.push(img);
                }
            }
        }

        debug!("Found {} images on page {}", images.len(), self.number);
        images
    }

    fn decode_image(&self, obj: &Object) -> Option<DynamicImage> {
        let Object::Stream(stream) = obj else {
            return None;
        };
        let dict = &stream.dict;

        if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
            return None;
        }

        let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
        let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        trace!("Found image object: {}x{}", width, height);

        if let Ok(filter) = dict.get(b"Filter") {
            let filter_name = match filter {
                Object::Name(name) => Some(name.as_slice()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()),
                _ => None,
            };

            match filter_name {
                Some(b"DCTDecode") => {
                    return image::load_from_memory_with_format(
                        &stream.content,
                        image::ImageFormat::Jpeg,
                    )
                    .ok();
                }
                Some(b"JPXDecode") | Some(b"CCITTFaxDecode") | Some(b"JBIG2Decode") => {
                    trace!("Unsupported image filter on page {}", self.number);
                    return None;
                }
                _ => {}
            }
        }

        let data = stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone());

        let color_space = dict
            .get(b"ColorSpace")
            .ok()
            .and_then(|o| match o {
                Object::Name(name) => Some(name.clone()),
                Object::Array(arr) => arr.first().and_then(|o| o.as_name().ok()).map(<[u8]>::to_vec),
                Object::Reference(r) => self
                    .doc
                    .get_object(*r)
                    .ok()
                    .and_then(|o| o.as_name().ok())
                    .map(<[u8]>::to_vec),
                _ => None,
            })
            .unwrap_or_else(|| b"DeviceRGB".to_vec());

        let bits = dict
            .get(b"BitsPerComponent")
            .ok()
            .and_then(|o| o.as_i64().ok())
            .unwrap_or(8);

        if bits != 8 {
            trace!("Unsupported bits per component: {}", bits);
            return None;
        }

        decode_raw_pixels(&data, width, height, &color_space)
    }
}

#[async_trait]
impl PageHandle for LopdfPage {
    fn number(&self) -> u32 {
        self.number
    }

    async fn text_runs(&self) -> Result<Vec<TextRun>, PageAccessError> {
        let page = self.clone();
        let text = tokio::task::spawn_blocking(move || page.extract_text())
            .await
            .map_err(|e| PageAccessError::TextExtraction {
                page: self.number,
                reason: format!("extraction task failed: {}", e),
            })??;
        let runs: Vec<TextRun> = text
            .lines()
            .map(|line| TextRun::line(line.trim_end()))
            .collect();
        trace!("Page {} yielded {} text runs", self.number, runs.len());
        Ok(runs)
    }

    async fn render(&self, surface: &mut RasterSurface, scale: f32) -> Result<(), PageAccessError> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(PageAccessError::Render {
                page: self.number,
                reason: format!("invalid scale {}", scale),
            });
        }

        let (width_pt, height_pt) = self.media_box();
        let width = (width_pt * scale).round().clamp(1.0, MAX_RASTER_EDGE) as u32;
        let height = (height_pt * scale).round().clamp(1.0, MAX_RASTER_EDGE) as u32;

        // Decoding and scaling are CPU bound; keep them off the async workers.
        let page = self.clone();
        let scaled = tokio::task::spawn_blocking(move || {
            // Scanned pages are one full-page image; draw the largest one.
            page.page_images()
                .into_iter()
                .max_by_key(|img| u64::from(img.width()) * u64::from(img.height()))
                .map(|img| stretch(&img, width, height))
        })
        .await
        .map_err(|e| PageAccessError::Render {
            page: self.number,
            reason: format!("rasterization task failed: {}", e),
        })?;

        surface.prepare(width, height);
        match scaled {
            Some(img) => surface.draw_scaled(&img),
            None => debug!("Page {} has no decodable image, rendering blank", self.number),
        }

        surface.set_page(Some(self.number));
        debug!("Rendered page {} at {}x{}", self.number, width, height);
        Ok(())
    }
}

fn as_number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

fn decode_raw_pixels(
    data: &[u8],
    width: u32,
    height: u32,
    color_space: &[u8],
) -> Option<DynamicImage> {
    let pixel_count = usize::try_from(width)
        .ok()?
        .checked_mul(usize::try_from(height).ok()?)?;

    let rgba: Vec<u8> = match color_space {
        b"DeviceRGB" | b"RGB" => data
            .get(..pixel_count.checked_mul(3)?)?
            .chunks_exact(3)
            .flat_map(|c| [c[0], c[1], c[2], 255])
            .collect(),
        b"DeviceGray" | b"G" => data
            .get(..pixel_count)?
            .iter()
            .flat_map(|&g| [g, g, g, 255])
            .collect(),
        _ => {
            trace!(
                "Could not decode image: data_len={}, colorspace={:?}",
                data.len(),
                String::from_utf8_lossy(color_space)
            );
            return None;
        }
    };

    ImageBuffer::<Rgba<u8>, _>::from_raw(width, height, rgba).map(DynamicImage::ImageRgba8)
}
