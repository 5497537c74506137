//! Error types for the echoread-core library.

use thiserror::Error;

/// Main error type for the echoread library.
#[derive(Error, Debug)]
pub enum EchoError {
    /// Document could not be opened.
    #[error("document error: {0}")]
    Document(#[from] DocumentLoadError),

    /// A single page could not be read or rendered.
    #[error("page error: {0}")]
    Page(#[from] PageAccessError),

    /// OCR engine error.
    #[error("OCR error: {0}")]
    Ocr(#[from] OcrError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors that end a viewing session before the first page is shown.
#[derive(Error, Debug)]
pub enum DocumentLoadError {
    /// No locator was supplied at startup.
    #[error("no PDF URL provided")]
    MissingLocator,

    /// The locator could not be reached (missing file, network failure).
    #[error("cannot reach {locator}: {reason}")]
    Unreachable { locator: String, reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status} while fetching {locator}")]
    Http { locator: String, status: u16 },

    /// The body exceeded the configured size limit.
    #[error("document exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    /// Failed to parse the PDF.
    #[error("failed to parse PDF: {0}")]
    Parse(String),

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted")]
    Encrypted,

    /// The PDF is empty or has no pages.
    #[error("PDF has no pages")]
    NoPages,
}

/// Errors affecting one page; the session stays usable.
#[derive(Error, Debug)]
pub enum PageAccessError {
    /// Requested page is outside `[1, page_count]`.
    #[error("page {requested} is out of range (1-{page_count})")]
    OutOfRange { requested: u32, page_count: u32 },

    /// No document is loaded.
    #[error("no document loaded")]
    NoDocument,

    /// Failed to extract text from the page.
    #[error("failed to extract text from page {page}: {reason}")]
    TextExtraction { page: u32, reason: String },

    /// Failed to rasterize the page.
    #[error("failed to render page {page}: {reason}")]
    Render { page: u32, reason: String },
}

/// Errors related to the OCR engine.
#[derive(Error, Debug, Clone)]
pub enum OcrError {
    /// Engine construction or language setup failed.
    #[error("engine initialization failed: {0}")]
    Init(String),

    /// Failed to load OCR models.
    #[error("failed to load model: {0}")]
    ModelLoad(String),

    /// Text recognition failed.
    #[error("text recognition failed: {0}")]
    Recognition(String),

    /// The engine is not ready or has been released.
    #[error("OCR engine unavailable")]
    Unavailable,
}

/// Result type for the echoread library.
pub type Result<T> = std::result::Result<T, EchoError>;
