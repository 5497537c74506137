//! Locator parsing and document byte fetching (local files and http).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Url;
use tracing::{debug, info};

use crate::error::{DocumentLoadError, EchoError};
use crate::models::config::FetchConfig;

/// Where a document comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// Local filesystem path.
    Path(PathBuf),
    /// Remote http(s) URL.
    Http(Url),
}

impl Locator {
    /// Parse a raw locator string.
    ///
    /// `http://` and `https://` become [`Locator::Http`], `file://` URLs and
    /// anything else are treated as filesystem paths.
    pub fn parse(raw: &str) -> Result<Self, DocumentLoadError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(DocumentLoadError::MissingLocator);
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(raw).map_err(|e| DocumentLoadError::Unreachable {
                locator: raw.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(Locator::Http(url));
        }

        if lower.starts_with("file://") {
            let path = Url::parse(raw)
                .ok()
                .and_then(|url| url.to_file_path().ok())
                .ok_or_else(|| DocumentLoadError::Unreachable {
                    locator: raw.to_string(),
                    reason: "invalid file URL".to_string(),
                })?;
            return Ok(Locator::Path(path));
        }

        Ok(Locator::Path(PathBuf::from(raw)))
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Locator::Path(path) => write!(f, "{}", path.display()),
            Locator::Http(url) => write!(f, "{}", url),
        }
    }
}

/// Download progress for incremental fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchProgress {
    /// Bytes received so far.
    pub received: u64,
    /// Total size, when the server announced it.
    pub total: Option<u64>,
}

/// Progress callback invoked after each received chunk.
pub type ProgressFn = Arc<dyn Fn(FetchProgress) + Send + Sync>;

/// Reads document bytes for a [`Locator`].
#[derive(Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    config: FetchConfig,
    progress: Option<ProgressFn>,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("config", &self.config)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Fetcher {
    /// Create a fetcher with its own http client.
    pub fn new(config: FetchConfig) -> Result<Self, EchoError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EchoError::Config(format!("failed to build http client: {}", e)))?;

        Ok(Self {
            client,
            config,
            progress: None,
        })
    }

    /// Report progress of incremental downloads to `progress`.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Read the whole document behind `locator`.
    pub async fn fetch(&self, locator: &Locator) -> Result<Vec<u8>, DocumentLoadError> {
        match locator {
            Locator::Path(path) => self.read_file(path).await,
            Locator::Http(url) => self.download(url).await,
        }
    }

    async fn read_file(&self, path: &Path) -> Result<Vec<u8>, DocumentLoadError> {
        let unreachable = |e: std::io::Error| DocumentLoadError::Unreachable {
            locator: path.display().to_string(),
            reason: e.to_string(),
        };

        let metadata = tokio::fs::metadata(path).await.map_err(unreachable)?;
        if metadata.len() > self.config.max_bytes {
            return Err(DocumentLoadError::TooLarge {
                limit: self.config.max_bytes,
            });
        }

        let data = tokio::fs::read(path).await.map_err(unreachable)?;
        debug!("Read {} bytes from {}", data.len(), path.display());
        Ok(data)
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, DocumentLoadError> {
        let unreachable = |e: reqwest::Error| DocumentLoadError::Unreachable {
            locator: url.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(unreachable)?;

        if !response.status().is_success() {
            return Err(DocumentLoadError::Http {
                locator: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let total = response.content_length();
        if total.is_some_and(|len| len > self.config.max_bytes) {
            return Err(DocumentLoadError::TooLarge {
                limit: self.config.max_bytes,
            });
        }

        let data = if self.config.incremental {
            let mut data = Vec::with_capacity(total.unwrap_or(0) as usize);
            let mut stream = response.bytes_stream();

            while let Some(chunk) = stream.next().await {
                let chunk = chunk.map_err(unreachable)?;
                data.extend_from_slice(&chunk);

                if data.len() as u64 > self.config.max_bytes {
                    return Err(DocumentLoadError::TooLarge {
                        limit: self.config.max_bytes,
                    });
                }

                if let Some(progress) = &self.progress {
                    (**progress)(FetchProgress {
                        received: data.len() as u64,
                        total,
                    });
                }
            }
            data
        } else {
            let bytes = response.bytes().await.map_err(unreachable)?;
            if bytes.len() as u64 > self.config.max_bytes {
                return Err(DocumentLoadError::TooLarge {
                    limit: self.config.max_bytes,
                });
            }
            bytes.to_vec()
        };

        info!("Downloaded {} bytes from {}", data.len(), url);
        Ok(data)
    }
}
