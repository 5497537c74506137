//! Configuration structures for the viewer.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration for echoread.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EchoConfig {
    /// Render controller configuration.
    pub viewer: ViewerConfig,

    /// OCR engine configuration.
    pub ocr: OcrConfig,

    /// Document fetching configuration.
    pub fetch: FetchConfig,
}

/// When the OCR engine is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcquisitionPolicy {
    /// Create the engine when the first scanned page is encountered.
    #[default]
    OnDemand,
    /// Start creating the engine right after the document loads.
    EagerBackground,
}

/// Render controller configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Pages whose trimmed extracted text is shorter than this many
    /// characters are treated as scanned.
    pub scan_threshold: usize,

    /// Magnification used when rasterizing scanned pages.
    pub raster_scale: f32,

    /// OCR engine acquisition policy.
    pub acquisition: AcquisitionPolicy,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            scan_threshold: 50,
            raster_scale: 1.5,
            acquisition: AcquisitionPolicy::OnDemand,
        }
    }
}

/// OCR engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Language tag; selects `<language>_rec.onnx`.
    pub language: String,

    /// Character dictionary file name, relative to `model_dir`.
    pub language_resource: String,

    /// Text detection model file name.
    pub detection_model: String,

    /// Keep `[UNK]` markers in recognized text.
    pub keep_unk: bool,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            language: "latin".to_string(),
            language_resource: "latin_dict.txt".to_string(),
            detection_model: "det.onnx".to_string(),
            keep_unk: false,
        }
    }
}

impl OcrConfig {
    /// File name of the recognition model for the configured language.
    pub fn recognition_model(&self) -> String {
        format!("{}_rec.onnx", self.language)
    }

    /// Get full path to a model file.
    pub fn model_path(&self, model_name: &str) -> PathBuf {
        self.model_dir.join(model_name)
    }
}

/// Document fetching configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Stream http bodies chunk by chunk, reporting progress.
    pub incremental: bool,

    /// Request timeout in seconds.
    pub timeout_secs: u64,

    /// Largest accepted document, in bytes.
    pub max_bytes: u64,

    /// User agent sent with http requests.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            incremental: false,
            timeout_secs: 60,
            max_bytes: 256 * 1024 * 1024,
            user_agent: concat!("echoread/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl EchoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &std::path::Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self).map_err(|e| {
            std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
        })?;
        std::fs::write(path, content)
    }
}
