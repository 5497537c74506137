//! Lazily acquired, session-wide OCR engine.
//!
//! Acquisition runs in a background task so the page that triggered it can
//! show its raster preview without waiting. The outcome is handed back over a
//! oneshot channel and applied on the controller's own timeline.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{OcrEngineFactory, OcrEngineHandle};
use crate::error::OcrError;
use crate::models::config::OcrConfig;

type Acquired = Result<Box<dyn OcrEngineHandle>, OcrError>;

/// Engine acquisition state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No acquisition attempted yet.
    Uninitialized,
    /// Construction and language setup are in flight.
    Initializing,
    /// Engine can recognize.
    Ready,
    /// Acquisition failed; stays failed for the session.
    Failed,
}

/// Holds the session's OCR engine and drives its acquisition.
pub struct EngineSlot {
    factory: Arc<dyn OcrEngineFactory>,
    state: EngineState,
    engine: Option<Box<dyn OcrEngineHandle>>,
    inflight: Option<oneshot::Receiver<Acquired>>,
    task: Option<JoinHandle<()>>,
    failure: Option<OcrError>,
    attempts: u32,
}

impl std::fmt::Debug for EngineSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineSlot")
            .field("state", &self.state)
            .field("attempts", &self.attempts)
            .field("failure", &self.failure)
            .finish()
    }
}

impl EngineSlot {
    /// Create an empty slot that will build engines with `factory`.
    pub fn new(factory: Arc<dyn OcrEngineFactory>) -> Self {
        Self {
            factory,
            state: EngineState::Uninitialized,
            engine: None,
            inflight: None,
            task: None,
            failure: None,
            attempts: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Number of acquisitions started this session (0 or 1).
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Error that put the slot into [`EngineState::Failed`].
    pub fn failure(&self) -> Option<&OcrError> {
        self.failure.as_ref()
    }

    /// The ready engine, if any.
    pub fn engine(&self) -> Option<&dyn OcrEngineHandle> {
        self.engine.as_deref()
    }

    /// Start acquisition in the background.
    ///
    /// Only acts from [`EngineState::Uninitialized`]; returns whether a new
    /// acquisition was started. Must be called from within a tokio runtime.
    pub fn begin(&mut self, config: &OcrConfig) -> bool {
        if self.state != EngineState::Uninitialized {
            return false;
        }

        let (tx, rx) = oneshot::channel();
        let factory = Arc::clone(&self.factory);
        let config = config.clone();

        self.task = Some(tokio::spawn(async move {
            let outcome = acquire(factory.as_ref(), &config).await;
            if tx.send(outcome).is_err() {
                debug!("Engine acquisition finished after the session ended");
            }
        }));

        self.inflight = Some(rx);
        self.state = EngineState::Initializing;
        self.attempts += 1;
        info!("OCR engine acquisition started");
        true
    }

    /// Wait for the in-flight acquisition and apply its outcome.
    ///
    /// Returns `None` when nothing is in flight. Cancel safe: dropping the
    /// future leaves the acquisition in flight.
    pub async fn wait(&mut self) -> Option<Result<(), OcrError>> {
        let rx = self.inflight.as_mut()?;
        let outcome = rx
            .await
            .unwrap_or_else(|_| Err(OcrError::Init("initialization task aborted".to_string())));
        Some(self.complete(outcome))
    }

    /// Apply the acquisition outcome if it already arrived, without waiting.
    pub fn poll_complete(&mut self) -> Option<Result<(), OcrError>> {
        let rx = self.inflight.as_mut()?;
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(OcrError::Init("initialization task aborted".to_string()))
            }
        };
        Some(self.complete(outcome))
    }

    fn complete(&mut self, outcome: Acquired) -> Result<(), OcrError> {
        self.inflight = None;
        self.task = None;

        match outcome {
            Ok(engine) => {
                self.engine = Some(engine);
                self.state = EngineState::Ready;
                info!("OCR engine ready");
                Ok(())
            }
            Err(err) => {
                warn!("OCR engine failed to load: {}", err);
                self.failure = Some(err.clone());
                self.state = EngineState::Failed;
                Err(err)
            }
        }
    }

    /// Release the engine and reset for a new session.
    pub async fn release(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.inflight = None;

        if let Some(mut engine) = self.engine.take() {
            engine.terminate().await;
            debug!("OCR engine terminated");
        }

        self.state = EngineState::Uninitialized;
        self.failure = None;
        self.attempts = 0;
    }
}

async fn acquire(factory: &dyn OcrEngineFactory, config: &OcrConfig) -> Acquired {
    let mut engine = factory
        .create(config)
        .await
        .map_err(|e| OcrError::Init(e.to_string()))?;
    engine
        .load_language_resource(&config.language_resource)
        .await
        .map_err(|e| OcrError::Init(e.to_string()))?;
    engine
        .initialize(&config.language)
        .await
        .map_err(|e| OcrError::Init(e.to_string()))?;
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::OcrResult;
    use crate::pdf::RasterSurface;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct NullEngine;

    #[async_trait]
    impl OcrEngineHandle for NullEngine {
        async fn load_language_resource(&mut self, _locator: &str) -> Result<(), OcrError> {
            Ok(())
        }

        async fn initialize(&mut self, language: &str) -> Result<(), OcrError> {
            if language == "broken" {
                return Err(OcrError::ModelLoad("no such language".to_string()));
            }
            Ok(())
        }

        async fn recognize(&self, surface: &RasterSurface) -> Result<OcrResult, OcrError> {
            Ok(OcrResult::from_text("", (surface.width(), surface.height())))
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        created: AtomicU32,
    }

    #[async_trait]
    impl OcrEngineFactory for CountingFactory {
        async fn create(&self, _config: &OcrConfig) -> Result<Box<dyn OcrEngineHandle>, OcrError> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(NullEngine))
        }
    }

    #[tokio::test]
    async fn test_begin_is_idempotent() {
        let factory = Arc::new(CountingFactory::default());
        let mut slot = EngineSlot::new(factory.clone());

        assert!(slot.begin(&OcrConfig::default()));
        assert!(!slot.begin(&OcrConfig::default()));
        assert_eq!(slot.state(), EngineState::Initializing);

        assert!(slot.wait().await.unwrap().is_ok());
        assert_eq!(slot.state(), EngineState::Ready);
        assert!(!slot.begin(&OcrConfig::default()));
        assert_eq!(factory.created.load(Ordering::SeqCst), 1);
        assert_eq!(slot.attempts(), 1);
    }

    #[tokio::test]
    async fn test_initialize_failure_is_terminal() {
        let mut slot = EngineSlot::new(Arc::new(CountingFactory::default()));
        let config = OcrConfig {
            language: "broken".to_string(),
            ..OcrConfig::default()
        };

        slot.begin(&config);
        let outcome = slot.wait().await.unwrap();
        assert!(matches!(outcome, Err(OcrError::Init(_))));
        assert_eq!(slot.state(), EngineState::Failed);
        assert!(slot.engine().is_none());
        assert!(!slot.begin(&OcrConfig::default()));
        assert!(slot.wait().await.is_none());
    }

    #[tokio::test]
    async fn test_release_resets_slot() {
        let mut slot = EngineSlot::new(Arc::new(CountingFactory::default()));
        slot.begin(&OcrConfig::default());
        slot.wait().await;
        slot.release().await;
        assert_eq!(slot.state(), EngineState::Uninitialized);
        assert_eq!(slot.attempts(), 0);
    }
}
