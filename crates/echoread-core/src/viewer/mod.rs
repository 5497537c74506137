//! Document render controller.
//!
//! Each page visit extracts the text layer and classifies the page. Digital
//! pages show their text directly and never touch the OCR engine. Scanned
//! pages are rasterized and shown at once; recognized text replaces the
//! preview when the engine is ready. While the engine is still being
//! acquired, the most recent scanned page waits in a single pending slot.
//!
//! The controller is driven through `&mut self`, so renders never overlap.
//! Every render takes a fresh request token and deferred work is applied
//! only while its token is still the latest one.

mod clean_view;
mod display;
mod text;

pub use clean_view::{CleanPage, CleanView, PageBody};
pub use display::{DisplaySurface, RasterPreview, SnapshotDisplay, VisibleLayer};
pub use text::{classify, html_to_plain, ocr_text_to_html, page_indicator_label, runs_to_html, PageKind};

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::{DocumentLoadError, OcrError, PageAccessError};
use crate::models::config::{AcquisitionPolicy, EchoConfig};
use crate::ocr::{EngineSlot, EngineState, OcrEngineFactory};
use crate::pdf::{DocumentHandle, DocumentProvider, PageHandle, RasterSurface};

const ENGINE_LOADING_STATUS: &str = "First-time setup: Loading OCR engine...";
const ENGINE_READY_STATUS: &str = "OCR engine ready.";
const DEGRADED_STATUS: &str = "OCR engine failed to load. Scanned pages will show as images.";

/// Navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Previous,
    Next,
}

/// Input commands for [`RenderController::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open a new document, replacing the current one.
    Open(String),
    /// Step one page back or forward.
    Navigate(Direction),
    /// Jump to a page.
    GoTo(u32),
    /// End the session.
    Close,
}

/// What happened to recognition for a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrStatus {
    /// Digital page; no recognition needed.
    NotNeeded,
    /// Recognized text replaced the raster preview.
    Recognized,
    /// Waiting for the engine; the raster preview stays.
    Pending,
    /// The engine failed to load this session; raster only.
    Degraded,
    /// Recognition failed; the raster preview stays.
    Failed { message: String },
}

/// Result of a completed page render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageOutcome {
    pub page: u32,
    pub kind: PageKind,
    pub ocr: OcrStatus,
}

/// Result of loading a document.
#[derive(Debug)]
pub struct LoadOutcome {
    pub page_count: u32,
    /// Render result for page 1.
    pub first_page: Result<PageOutcome, PageAccessError>,
}

/// Outcome of waiting for engine acquisition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineSettlement {
    /// No acquisition was in flight.
    Idle,
    /// The engine became ready; carries the pending page that was recognized.
    Ready { recognized: Option<(u32, OcrStatus)> },
    /// Acquisition failed; the session is raster-only from now on.
    Failed { error: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingOcr {
    page: u32,
    token: u64,
}

/// Drives page rendering for one viewing session.
pub struct RenderController<D: DisplaySurface> {
    config: EchoConfig,
    provider: Arc<dyn DocumentProvider>,
    display: D,
    document: Option<Box<dyn DocumentHandle>>,
    current_page: u32,
    surface: RasterSurface,
    engine: EngineSlot,
    pending: Option<PendingOcr>,
    latest_token: u64,
    /// Token of the render now on screen.
    displayed_token: u64,
}

impl<D: DisplaySurface> RenderController<D> {
    /// Create a controller with no document loaded.
    pub fn new(
        config: EchoConfig,
        provider: Arc<dyn DocumentProvider>,
        ocr_factory: Arc<dyn OcrEngineFactory>,
        display: D,
    ) -> Self {
        Self {
            config,
            provider,
            display,
            document: None,
            current_page: 0,
            surface: RasterSurface::new(),
            engine: EngineSlot::new(ocr_factory),
            pending: None,
            latest_token: 0,
            displayed_token: 0,
        }
    }

    /// Current page (0 when no document is loaded).
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// Page count of the loaded document (0 when none).
    pub fn page_count(&self) -> u32 {
        self.document.as_ref().map_or(0, |doc| doc.page_count())
    }

    /// OCR engine state.
    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Number of engine acquisitions started this session.
    pub fn engine_attempts(&self) -> u32 {
        self.engine.attempts()
    }

    /// Page waiting for the engine, if any.
    pub fn pending_page(&self) -> Option<u32> {
        self.pending.map(|p| p.page)
    }

    /// The display.
    pub fn display(&self) -> &D {
        &self.display
    }

    /// Start a session from an optional startup locator.
    ///
    /// A missing locator is the startup error state: a fatal message is
    /// shown and [`DocumentLoadError::MissingLocator`] returned.
    pub async fn start(&mut self, locator: Option<&str>) -> Result<LoadOutcome, DocumentLoadError> {
        match locator.map(str::trim).filter(|l| !l.is_empty()) {
            Some(locator) => self.load_document(locator).await,
            None => {
                let err = DocumentLoadError::MissingLocator;
                warn!("Viewer started without a document locator");
                self.display
                    .show_fatal("Error: No PDF URL provided. Please go back.");
                Err(err)
            }
        }
    }

    /// Open a document and render its first page.
    pub async fn load_document(&mut self, locator: &str) -> Result<LoadOutcome, DocumentLoadError> {
        self.display.set_status("Loading PDF document...");

        let document = match self.provider.open(locator).await {
            Ok(doc) if doc.page_count() == 0 => Err(DocumentLoadError::NoPages),
            other => other,
        };

        let document = match document {
            Ok(document) => document,
            Err(err) => {
                warn!("Failed to load {}: {}", locator, err);
                // The previous document, if any, is gone with the failed load.
                self.document = None;
                self.current_page = 0;
                self.pending = None;
                self.surface.release();
                self.display.show_fatal(&format!("Fatal Error: {}", err));
                return Err(err);
            }
        };

        let page_count = document.page_count();
        info!("Loaded document with {} pages", page_count);

        self.document = Some(document);
        self.current_page = 1;
        self.pending = None;

        if self.config.viewer.acquisition == AcquisitionPolicy::EagerBackground
            && self.engine.begin(&self.config.ocr)
        {
            debug!("Started OCR engine acquisition alongside page 1");
        }

        let first_page = self.render_page(1).await;
        Ok(LoadOutcome {
            page_count,
            first_page,
        })
    }

    /// Step one page back or forward.
    ///
    /// Returns `None` without touching the display when the step would leave
    /// the document.
    pub async fn navigate(
        &mut self,
        direction: Direction,
    ) -> Option<Result<PageOutcome, PageAccessError>> {
        let page_count = self.page_count();
        let target = match direction {
            Direction::Previous => self.current_page.checked_sub(1).filter(|p| *p >= 1),
            Direction::Next => Some(self.current_page + 1).filter(|p| *p <= page_count),
        };

        match target {
            Some(target) if self.document.is_some() => Some(self.render_page(target).await),
            _ => {
                debug!("Ignoring {:?} at page {}", direction, self.current_page);
                None
            }
        }
    }

    /// Jump to `index`; same rules as [`render_page`](Self::render_page).
    pub async fn go_to(&mut self, index: u32) -> Result<PageOutcome, PageAccessError> {
        self.render_page(index).await
    }

    /// Render page `index`.
    ///
    /// Out-of-range requests are rejected without side effects. Failures of
    /// extraction or rasterization are shown on the status line, keep the
    /// current page and re-enable navigation.
    pub async fn render_page(&mut self, index: u32) -> Result<PageOutcome, PageAccessError> {
        let page_count = match &self.document {
            Some(doc) => doc.page_count(),
            None => return Err(PageAccessError::NoDocument),
        };
        if index < 1 || index > page_count {
            debug!("Rejecting page {} of {}", index, page_count);
            return Err(PageAccessError::OutOfRange {
                requested: index,
                page_count,
            });
        }

        self.latest_token += 1;
        let token = self.latest_token;

        self.display.set_status(&format!("Loading page {}...", index));
        self.display.set_nav_enabled(false, false);

        match self.render_inner(index, token).await {
            Ok(outcome) => {
                self.current_page = index;
                self.displayed_token = token;
                self.display.set_page_indicator(index, page_count);
                self.refresh_nav();
                self.display.scroll_to_top();
                Ok(outcome)
            }
            Err(err) => {
                warn!("Error rendering page {}: {}", index, err);
                self.display
                    .set_status(&format!("Error on page {}: {}", index, err));
                self.refresh_nav();
                Err(err)
            }
        }
    }

    async fn render_inner(&mut self, index: u32, token: u64) -> Result<PageOutcome, PageAccessError> {
        let page: Box<dyn PageHandle> = match &self.document {
            Some(doc) => doc.page(index).await?,
            None => return Err(PageAccessError::NoDocument),
        };

        let runs = page.text_runs().await?;
        let kind = classify(&runs, self.config.viewer.scan_threshold);
        debug!("Page {} classified as {:?} ({} runs)", index, kind, runs.len());

        if kind == PageKind::Digital {
            self.display.show_text(&runs_to_html(&runs));
            self.display
                .set_status(&format!("Page {} loaded (Digital).", index));
            return Ok(PageOutcome {
                page: index,
                kind,
                ocr: OcrStatus::NotNeeded,
            });
        }

        self.display
            .set_status("Digital text not found. Preparing scan...");
        page.render(&mut self.surface, self.config.viewer.raster_scale)
            .await?;
        self.surface.set_page(Some(index));
        self.display.show_raster(&self.surface);
        self.display.set_status("Image loaded. OCR in progress...");

        let ocr = self.recognize_or_defer(index, token).await;
        Ok(PageOutcome {
            page: index,
            kind,
            ocr,
        })
    }

    async fn recognize_or_defer(&mut self, index: u32, token: u64) -> OcrStatus {
        // An eager acquisition may have finished since the last event.
        if let Some(outcome) = self.engine.poll_complete() {
            if let Some(stale) = self.pending.take() {
                debug!("Dropping pending OCR request for page {}", stale.page);
            }
            if outcome.is_err() {
                self.display.set_status(DEGRADED_STATUS);
            }
        }

        match self.engine.state() {
            EngineState::Ready => self.recognize_surface(index).await,
            EngineState::Uninitialized => {
                self.pending = Some(PendingOcr { page: index, token });
                self.display.set_status(ENGINE_LOADING_STATUS);
                self.engine.begin(&self.config.ocr);
                OcrStatus::Pending
            }
            EngineState::Initializing => {
                if let Some(previous) = self.pending.replace(PendingOcr { page: index, token }) {
                    debug!(
                        "Pending OCR request for page {} replaced by page {}",
                        previous.page, index
                    );
                }
                self.display.set_status(ENGINE_LOADING_STATUS);
                OcrStatus::Pending
            }
            EngineState::Failed => {
                debug!(
                    "Page {} stays raster-only: {:?}",
                    index,
                    self.engine.failure()
                );
                self.display.set_status(DEGRADED_STATUS);
                OcrStatus::Degraded
            }
        }
    }

    async fn recognize_surface(&mut self, index: u32) -> OcrStatus {
        let Some(engine) = self.engine.engine() else {
            return OcrStatus::Degraded;
        };

        self.display
            .set_status(&format!("Running OCR on page {}...", index));

        match engine.recognize(&self.surface).await {
            Ok(result) => {
                info!(
                    "Recognized page {} ({} chars)",
                    index,
                    result.text.chars().count()
                );
                self.display.show_text(&ocr_text_to_html(&result.text));
                self.display
                    .set_status(&format!("Page {} loaded (from Scan).", index));
                OcrStatus::Recognized
            }
            Err(err) => {
                warn!("OCR failed on page {}: {}", index, err);
                self.display.set_status(&format!(
                    "OCR error on page {}: {}. Showing image.",
                    index, err
                ));
                OcrStatus::Failed {
                    message: err.to_string(),
                }
            }
        }
    }

    /// Wait for an in-flight engine acquisition and apply its outcome.
    ///
    /// On success, the pending page is recognized if it is still the page on
    /// screen. On failure, the session degrades to raster-only.
    pub async fn settle_engine(&mut self) -> EngineSettlement {
        match self.engine.wait().await {
            Some(outcome) => self.apply_engine_outcome(outcome).await,
            None => EngineSettlement::Idle,
        }
    }

    async fn apply_engine_outcome(&mut self, outcome: Result<(), OcrError>) -> EngineSettlement {
        let pending = self.pending.take();

        if let Err(err) = outcome {
            self.display.set_status(DEGRADED_STATUS);
            return EngineSettlement::Failed {
                error: err.to_string(),
            };
        }

        self.display.set_status(ENGINE_READY_STATUS);

        let recognized = match pending {
            Some(p)
                if p.token == self.displayed_token
                    && p.page == self.current_page
                    && self.surface.page() == Some(p.page) =>
            {
                let status = self.recognize_surface(p.page).await;
                Some((p.page, status))
            }
            Some(p) => {
                debug!("Pending OCR request for page {} is stale", p.page);
                None
            }
            None => None,
        };

        EngineSettlement::Ready { recognized }
    }

    /// Process commands until [`Command::Close`] or the channel closes,
    /// applying engine acquisition outcomes as they arrive. Tears the
    /// session down on exit.
    pub async fn run(&mut self, mut commands: mpsc::Receiver<Command>) {
        loop {
            let initializing = self.engine.state() == EngineState::Initializing;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Open(locator)) => {
                        if let Err(err) = self.load_document(&locator).await {
                            debug!("Open failed: {}", err);
                        }
                    }
                    Some(Command::Navigate(direction)) => {
                        if let Some(Err(err)) = self.navigate(direction).await {
                            debug!("Navigation failed: {}", err);
                        }
                    }
                    Some(Command::GoTo(index)) => {
                        if let Err(err) = self.go_to(index).await {
                            debug!("Jump to page {} failed: {}", index, err);
                        }
                    }
                    Some(Command::Close) | None => break,
                },
                outcome = self.engine.wait(), if initializing => {
                    if let Some(outcome) = outcome {
                        let settlement = self.apply_engine_outcome(outcome).await;
                        debug!("Engine settled: {:?}", settlement);
                    }
                }
            }
        }

        self.teardown().await;
    }

    /// End the session: release the engine, the raster buffer, the pending
    /// slot and the document.
    pub async fn teardown(&mut self) {
        self.engine.release().await;
        self.surface.release();
        self.pending = None;
        self.document = None;
        self.current_page = 0;
        info!("Viewing session closed");
    }

    fn refresh_nav(&mut self) {
        let page_count = self.page_count();
        self.display.set_nav_enabled(
            self.current_page > 1,
            self.current_page >= 1 && self.current_page < page_count,
        );
    }
}

impl<D: DisplaySurface + std::fmt::Debug> std::fmt::Debug for RenderController<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderController")
            .field("current_page", &self.current_page)
            .field("page_count", &self.page_count())
            .field("engine", &self.engine)
            .field("pending", &self.pending)
            .field("latest_token", &self.latest_token)
            .field("displayed_token", &self.displayed_token)
            .field("display", &self.display)
            .finish()
    }
}
