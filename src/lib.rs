//! # listing-photo-dl
//!
//! Fetches a page of real-estate listings from the listings API and downloads
//! every listing's photo in parallel.
//!
//! ## Design Philosophy
//!
//! - **Capabilities at the edges** - the network is a [`Transport`], the
//!   destination is a [`Sink`]; both can be swapped for tests or embedding
//! - **Retry what is transient** - 4xx answers fail at once, other non-2xx
//!   statuses are retried on a fixed delay
//! - **Fail together** - one failed photo never cancels the others; the run
//!   reports every failure once all downloads have finished
//!
//! ## Quick Start
//!
//! ```no_run
//! use listing_photo_dl::{Config, PhotoDownloader};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let downloader = PhotoDownloader::new(Config::default())?;
//!     let summary = downloader.run(&CancellationToken::new()).await?;
//!     println!("saved {} photos", summary.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Listing fetch, fan-out and per-photo download
pub mod downloader;
/// Error types
pub mod error;
/// Retry logic for transient HTTP statuses
pub mod retry;
/// Photo destination capability
pub mod sink;
/// HTTP transport capability
pub mod transport;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::Config;
pub use downloader::PhotoDownloader;
pub use error::{
    DownloadError, DownloadFailures, Error, ErrorKind, ItemFailure, RequestError, Result,
};
pub use sink::{FileSink, Sink};
pub use transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport, TransportError};
pub use types::{DownloadOutcome, DownloadSummary, ListingRecord, ListingsResponse, SavedPhoto};

use tokio_util::sync::CancellationToken;

/// Run the downloader, cancelling it when a termination signal arrives.
///
/// Ctrl+C (SIGINT) stops the run on every platform; SIGTERM does too on unix.
/// In-flight requests and retry delays stop at the signal and the run returns
/// whatever error cancellation produced. The signal watcher is torn down once
/// the run finishes, whatever its outcome.
pub async fn run_with_shutdown(downloader: &PhotoDownloader) -> Result<DownloadSummary> {
    let cancel = CancellationToken::new();
    let watcher = tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = downloader.run(&cancel).await;
    cancel.cancel();
    if let Err(e) = watcher.await {
        tracing::error!(error = %e, "Signal watcher panicked");
    }
    result
}

async fn cancel_on_signal(cancel: CancellationToken) {
    tokio::select! {
        received = wait_for_signal() => {
            tracing::warn!(signal = received, "Shutdown signal received, cancelling downloads");
            cancel.cancel();
        }
        _ = cancel.cancelled() => {}
    }
}

/// Resolve with the name of the first shutdown signal
///
/// A handler that cannot be registered just never fires.
async fn wait_for_signal() -> &'static str {
    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
        "SIGINT"
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
        "SIGTERM"
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<&'static str>();

    tokio::select! {
        name = interrupt => name,
        name = terminate => name,
    }
}
