//! Subcommands.

pub mod config;
pub mod convert;
pub mod view;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use echoread_core::pdf::{FetchProgress, ProgressFn};
use echoread_core::{
    DisplaySurface, EchoConfig, Fetcher, LopdfProvider, PureOcrFactory, RenderController,
};

/// Default location of the configuration file.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("echoread")
        .join("config.json")
}

/// Resolve the config file in effect: the `--config` flag, else the default path.
pub fn config_path(explicit: Option<&str>) -> PathBuf {
    explicit.map(PathBuf::from).unwrap_or_else(default_config_path)
}

/// Load configuration, falling back to defaults when no file exists.
///
/// An explicitly named file must exist.
pub fn load_config(explicit: Option<&str>) -> anyhow::Result<EchoConfig> {
    let path = config_path(explicit);

    if explicit.is_some() || path.exists() {
        debug!("Loading configuration from {}", path.display());
        return read_config(&path);
    }

    Ok(EchoConfig::default())
}

fn read_config(path: &Path) -> anyhow::Result<EchoConfig> {
    EchoConfig::from_file(path).map_err(|e| {
        anyhow::anyhow!("Failed to read config {}: {}", path.display(), e)
    })
}

/// Build a controller over the lopdf provider and the pure Rust OCR engine.
pub fn build_controller<D: DisplaySurface>(
    config: EchoConfig,
    display: D,
    progress: Option<ProgressFn>,
) -> anyhow::Result<RenderController<D>> {
    let mut fetcher = Fetcher::new(config.fetch.clone())?;
    if let Some(progress) = progress {
        fetcher = fetcher.with_progress(progress);
    }

    let provider = Arc::new(LopdfProvider::new(fetcher));
    let factory = Arc::new(PureOcrFactory::new());
    Ok(RenderController::new(config, provider, factory, display))
}

/// Spinner fed by incremental downloads; `None` when fetching in one piece.
pub fn fetch_spinner(config: &EchoConfig) -> anyhow::Result<Option<(ProgressBar, ProgressFn)>> {
    if !config.fetch.incremental {
        return Ok(None);
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Loading PDF document...");

    let handle = pb.clone();
    let progress: ProgressFn = Arc::new(move |p: FetchProgress| {
        let message = match p.total {
            Some(total) if total > 0 => format!(
                "Loading PDF document... {}%",
                (p.received * 100 / total).min(100)
            ),
            _ => format!("Loading PDF document... {} KiB", p.received / 1024),
        };
        handle.set_message(message);
    });

    Ok(Some((pb, progress)))
}
