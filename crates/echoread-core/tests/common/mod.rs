//! Scripted collaborators for controller tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use echoread_core::models::config::OcrConfig;
use echoread_core::{
    DisplaySurface, DocumentHandle, DocumentLoadError, DocumentProvider, EchoConfig, OcrEngineFactory,
    OcrEngineHandle, OcrError, OcrResult, PageAccessError, PageHandle, RasterSurface,
    RenderController, SnapshotDisplay, TextRun,
};

pub const LONG_TEXT: &str =
    "This paragraph has more than enough extractable characters to count as digital text.";
pub const SHORT_TEXT: &str = "Scan 0001";

/// Shared log of collaborator calls, e.g. `extract:2`, `render:2`, `recognize:2`.
pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

#[derive(Debug, Clone, Default)]
pub struct ScriptedPage {
    pub text: String,
    pub fail_text: bool,
    pub fail_render: bool,
}

impl ScriptedPage {
    pub fn digital() -> Self {
        Self {
            text: LONG_TEXT.to_string(),
            ..Self::default()
        }
    }

    pub fn scanned() -> Self {
        Self {
            text: SHORT_TEXT.to_string(),
            ..Self::default()
        }
    }

    pub fn unreadable() -> Self {
        Self {
            fail_text: true,
            ..Self::default()
        }
    }
}

pub struct FakeProvider {
    documents: HashMap<String, Arc<Vec<ScriptedPage>>>,
    log: CallLog,
}

impl FakeProvider {
    pub fn new(log: CallLog) -> Self {
        Self {
            documents: HashMap::new(),
            log,
        }
    }

    pub fn with_document(mut self, locator: &str, pages: Vec<ScriptedPage>) -> Self {
        self.documents.insert(locator.to_string(), Arc::new(pages));
        self
    }
}

#[async_trait]
impl DocumentProvider for FakeProvider {
    async fn open(&self, locator: &str) -> Result<Box<dyn DocumentHandle>, DocumentLoadError> {
        self.log.lock().unwrap().push(format!("open:{}", locator));
        let pages = self
            .documents
            .get(locator)
            .cloned()
            .ok_or_else(|| DocumentLoadError::Unreachable {
                locator: locator.to_string(),
                reason: "not found".to_string(),
            })?;
        Ok(Box::new(FakeDocument {
            pages,
            log: self.log.clone(),
        }))
    }
}

struct FakeDocument {
    pages: Arc<Vec<ScriptedPage>>,
    log: CallLog,
}

#[async_trait]
impl DocumentHandle for FakeDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    async fn page(&self, index: u32) -> Result<Box<dyn PageHandle>, PageAccessError> {
        let script = self
            .pages
            .get((index as usize).wrapping_sub(1))
            .cloned()
            .ok_or(PageAccessError::OutOfRange {
                requested: index,
                page_count: self.page_count(),
            })?;
        Ok(Box::new(FakePage {
            number: index,
            script,
            log: self.log.clone(),
        }))
    }
}

struct FakePage {
    number: u32,
    script: ScriptedPage,
    log: CallLog,
}

#[async_trait]
impl PageHandle for FakePage {
    fn number(&self) -> u32 {
        self.number
    }

    async fn text_runs(&self) -> Result<Vec<TextRun>, PageAccessError> {
        self.log.lock().unwrap().push(format!("extract:{}", self.number));
        if self.script.fail_text {
            return Err(PageAccessError::TextExtraction {
                page: self.number,
                reason: "corrupt content stream".to_string(),
            });
        }
        Ok(self.script.text.lines().map(TextRun::line).collect())
    }

    async fn render(&self, surface: &mut RasterSurface, scale: f32) -> Result<(), PageAccessError> {
        self.log.lock().unwrap().push(format!("render:{}", self.number));
        if self.script.fail_render {
            return Err(PageAccessError::Render {
                page: self.number,
                reason: "broken image".to_string(),
            });
        }
        surface.prepare((100.0 * scale) as u32, (140.0 * scale) as u32);
        surface.set_page(Some(self.number));
        Ok(())
    }
}

/// How the fake factory behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryMode {
    Succeed,
    FailCreate,
    FailLanguage,
}

pub struct FakeOcrFactory {
    mode: FactoryMode,
    gate: Option<Arc<Notify>>,
    fail_pages: HashSet<u32>,
    pub created: Arc<AtomicU32>,
    pub terminated: Arc<AtomicBool>,
    log: CallLog,
}

impl FakeOcrFactory {
    pub fn new(mode: FactoryMode, log: CallLog) -> Self {
        Self {
            mode,
            gate: None,
            fail_pages: HashSet::new(),
            created: Arc::new(AtomicU32::new(0)),
            terminated: Arc::new(AtomicBool::new(false)),
            log,
        }
    }

    /// Hold construction until the returned notifier fires.
    pub fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(gate.clone());
        (self, gate)
    }

    pub fn failing_recognition_on(mut self, page: u32) -> Self {
        self.fail_pages.insert(page);
        self
    }

    pub fn created(&self) -> u32 {
        self.created.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngineFactory for FakeOcrFactory {
    async fn create(&self, _config: &OcrConfig) -> Result<Box<dyn OcrEngineHandle>, OcrError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.mode == FactoryMode::FailCreate {
            return Err(OcrError::ModelLoad("worker script missing".to_string()));
        }
        Ok(Box::new(FakeEngine {
            fail_language: self.mode == FactoryMode::FailLanguage,
            fail_pages: self.fail_pages.clone(),
            terminated: self.terminated.clone(),
            log: self.log.clone(),
        }))
    }
}

struct FakeEngine {
    fail_language: bool,
    fail_pages: HashSet<u32>,
    terminated: Arc<AtomicBool>,
    log: CallLog,
}

#[async_trait]
impl OcrEngineHandle for FakeEngine {
    async fn load_language_resource(&mut self, _locator: &str) -> Result<(), OcrError> {
        if self.fail_language {
            return Err(OcrError::ModelLoad("traineddata unreadable".to_string()));
        }
        Ok(())
    }

    async fn initialize(&mut self, _language: &str) -> Result<(), OcrError> {
        Ok(())
    }

    async fn recognize(&self, surface: &RasterSurface) -> Result<OcrResult, OcrError> {
        let page = surface.page().unwrap_or(0);
        self.log.lock().unwrap().push(format!("recognize:{}", page));
        if self.fail_pages.contains(&page) {
            return Err(OcrError::Recognition("image too noisy".to_string()));
        }
        Ok(OcrResult::from_text(
            format!("OCR page {}", page),
            (surface.width(), surface.height()),
        ))
    }

    async fn terminate(&mut self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

pub fn controller_with<D: DisplaySurface>(
    config: EchoConfig,
    provider: FakeProvider,
    factory: Arc<FakeOcrFactory>,
    display: D,
) -> RenderController<D> {
    RenderController::new(config, Arc::new(provider), factory, display)
}

/// Controller over one document registered as `doc.pdf`.
pub fn controller(
    pages: Vec<ScriptedPage>,
    factory: FakeOcrFactory,
    log: &CallLog,
) -> (RenderController<SnapshotDisplay>, Arc<FakeOcrFactory>) {
    let provider = FakeProvider::new(log.clone()).with_document("doc.pdf", pages);
    let factory = Arc::new(factory);
    let controller = controller_with(
        EchoConfig::default(),
        provider,
        factory.clone(),
        SnapshotDisplay::new(),
    );
    (controller, factory)
}

pub fn new_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}
