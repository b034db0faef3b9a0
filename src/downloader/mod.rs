//! Photo downloader split into focused submodules.
//!
//! The `PhotoDownloader` struct and its methods are organized by stage:
//! - [`fetch`] - Listings request, status retries and readiness polling
//! - [`orchestration`] - One task per listing, fail-together aggregation
//! - [`item`] - Single photo download into the sink

mod fetch;
mod item;
mod orchestration;

use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::sink::{FileSink, Sink};
use crate::transport::{ReqwestTransport, Transport};
use crate::types::DownloadSummary;

/// Main downloader instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct PhotoDownloader {
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// HTTP capability shared by the fetcher and every download task
    pub(crate) transport: Arc<dyn Transport>,
    /// Destination for photo bytes
    pub(crate) sink: Arc<dyn Sink>,
}

impl PhotoDownloader {
    /// Create a downloader using reqwest and the local filesystem
    ///
    /// Validates the configuration first.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let transport = ReqwestTransport::new(&config.http).map_err(|e| Error::Config {
            message: format!("failed to build HTTP client: {e}"),
            key: Some("http".to_string()),
        })?;
        let sink = FileSink::new(config.download.output_dir.clone());

        Ok(Self::with_capabilities(
            config,
            Arc::new(transport),
            Arc::new(sink),
        ))
    }

    /// Create a downloader over caller-supplied transport and sink
    ///
    /// The configuration is used as-is; an invalid base URL surfaces as
    /// [`Error::CreatingHousesRequest`] when fetching.
    pub fn with_capabilities(
        config: Config,
        transport: Arc<dyn Transport>,
        sink: Arc<dyn Sink>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            sink,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetch the listings, then download every listing's photo
    ///
    /// Fetch failures abort before any download starts. Download failures are
    /// reported together once every task has finished.
    pub async fn run(&self, cancel: &CancellationToken) -> Result<DownloadSummary> {
        let listings = self.fetch(cancel).await?;
        self.download_all(cancel, listings.houses).await
    }
}
