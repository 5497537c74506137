//! Core library for the EchoRead accessible document viewer.
//!
//! This crate provides:
//! - PDF access (locators, per-page text runs, page rasterization)
//! - A lazily acquired OCR engine with a pure Rust backend
//! - The document render controller: digital/scanned classification,
//!   raster previews, deferred recognition and a clean-view export

pub mod error;
pub mod models;
pub mod ocr;
pub mod pdf;
pub mod viewer;

pub use error::{DocumentLoadError, EchoError, OcrError, PageAccessError, Result};
pub use models::config::{AcquisitionPolicy, EchoConfig};
pub use ocr::{EngineState, OcrEngineFactory, OcrEngineHandle, OcrResult, TextBox};
#[cfg(feature = "native")]
pub use ocr::{PureOcrEngine, PureOcrFactory};
pub use pdf::{
    DocumentHandle, DocumentProvider, Fetcher, LopdfProvider, PageHandle, RasterSurface, TextRun,
};
pub use viewer::{
    CleanView, Command, Direction, DisplaySurface, EngineSettlement, OcrStatus, PageKind,
    PageOutcome, RenderController, SnapshotDisplay,
};
