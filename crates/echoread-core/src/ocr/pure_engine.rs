//! OCR engine backed by `pure-onnx-ocr` (pure Rust, no external ONNX Runtime).

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{OcrEngineFactory, OcrEngineHandle, OcrResult, TextBox};
use crate::error::OcrError;
use crate::models::config::OcrConfig;
use crate::pdf::RasterSurface;

/// Builds [`PureOcrEngine`]s from a model directory.
#[derive(Debug, Clone, Default)]
pub struct PureOcrFactory;

impl PureOcrFactory {
    /// Create a factory.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OcrEngineFactory for PureOcrFactory {
    async fn create(&self, config: &OcrConfig) -> Result<Box<dyn OcrEngineHandle>, OcrError> {
        let model_dir = config.model_dir.clone();
        if !model_dir.is_dir() {
            return Err(OcrError::ModelLoad(format!(
                "model directory not found: {}",
                model_dir.display()
            )));
        }

        let det_path = config.model_path(&config.detection_model);
        if !det_path.exists() {
            return Err(OcrError::ModelLoad(format!(
                "detection model not found: {}",
                det_path.display()
            )));
        }

        let rec_path = config.model_path(&config.recognition_model());
        if !rec_path.exists() {
            return Err(OcrError::ModelLoad(format!(
                "recognition model not found: {}",
                rec_path.display()
            )));
        }

        debug!("Creating pure-onnx-ocr engine from {}", model_dir.display());
        Ok(Box::new(PureOcrEngine {
            model_dir,
            det_path,
            dict_path: None,
            keep_unk: config.keep_unk,
            engine: None,
        }))
    }
}

/// OCR engine backed by `pure-onnx-ocr`.
pub struct PureOcrEngine {
    model_dir: PathBuf,
    det_path: PathBuf,
    dict_path: Option<PathBuf>,
    keep_unk: bool,
    engine: Option<Arc<Mutex<pure_onnx_ocr::engine::OcrEngine>>>,
}

#[async_trait]
impl OcrEngineHandle for PureOcrEngine {
    async fn load_language_resource(&mut self, locator: &str) -> Result<(), OcrError> {
        let path = self.model_dir.join(locator);
        let dictionary = tokio::fs::read_to_string(&path).await.map_err(|e| {
            OcrError::ModelLoad(format!("failed to read {}: {}", path.display(), e))
        })?;

        if dictionary.lines().all(|line| line.trim().is_empty()) {
            return Err(OcrError::ModelLoad(format!(
                "character dictionary {} is empty",
                path.display()
            )));
        }

        debug!(
            "Loaded character dictionary {} ({} entries)",
            path.display(),
            dictionary.lines().count()
        );
        self.dict_path = Some(path);
        Ok(())
    }

    async fn initialize(&mut self, language: &str) -> Result<(), OcrError> {
        let dict_path = self.dict_path.clone().ok_or_else(|| {
            OcrError::Init("language resource must be loaded before initialize".to_string())
        })?;
        let rec_path = self.model_dir.join(format!("{}_rec.onnx", language));
        let det_path = self.det_path.clone();

        // Model loading is CPU bound; keep it off the async workers.
        let engine = tokio::task::spawn_blocking(move || {
            pure_onnx_ocr::engine::OcrEngineBuilder::new()
                .det_model_path(&det_path)
                .rec_model_path(&rec_path)
                .dictionary_path(&dict_path)
                .build()
                .map_err(|e| OcrError::ModelLoad(format!("pure-onnx-ocr: {}", e)))
        })
        .await
        .map_err(|e| OcrError::Init(format!("model loading task failed: {}", e)))??;

        info!("Loaded pure-onnx-ocr engine for '{}'", language);
        self.engine = Some(Arc::new(Mutex::new(engine)));
        Ok(())
    }

    async fn recognize(&self, surface: &RasterSurface) -> Result<OcrResult, OcrError> {
        let engine = self.engine.clone().ok_or(OcrError::Unavailable)?;
        let image = surface.to_image();
        let image_size = (surface.width(), surface.height());
        let keep_unk = self.keep_unk;

        tokio::task::spawn_blocking(move || {
            let start = Instant::now();
            let engine = engine
                .lock()
                .map_err(|_| OcrError::Recognition("engine lock poisoned".to_string()))?;

            let results = engine
                .run_from_image(&image)
                .map_err(|e| OcrError::Recognition(format!("pure-onnx-ocr: {}", e)))?;

            debug!("pure-onnx-ocr returned {} text regions", results.len());

            let boxes = results
                .iter()
                .map(|r| TextBox {
                    bbox: polygon_to_bbox(&r.bounding_box),
                    text: if keep_unk {
                        r.text.clone()
                    } else {
                        r.text.replace("[UNK]", " ")
                    },
                    confidence: r.confidence,
                })
                .collect();

            let mut result = OcrResult {
                boxes,
                text: String::new(),
                processing_time_ms: 0,
                image_size,
            };
            result.sort_by_reading_order();
            result.processing_time_ms = start.elapsed().as_millis() as u64;

            info!(
                "OCR complete: {} text boxes in {}ms",
                result.boxes.len(),
                result.processing_time_ms
            );
            Ok(result)
        })
        .await
        .map_err(|e| OcrError::Recognition(format!("recognition task failed: {}", e)))?
    }

    async fn terminate(&mut self) {
        self.engine = None;
    }
}

/// Convert a `Polygon<f64>` to our `[f32; 8]` bbox format.
///
/// Extracts the first 4 exterior points (quadrilateral) as
/// `[x1, y1, x2, y2, x3, y3, x4, y4]`.
fn polygon_to_bbox(polygon: &pure_onnx_ocr::Polygon<f64>) -> [f32; 8] {
    let mut bbox = [0.0f32; 8];
    for (i, coord) in polygon.exterior().coords().take(4).enumerate() {
        bbox[i * 2] = coord.x as f32;
        bbox[i * 2 + 1] = coord.y as f32;
    }
    bbox
}
