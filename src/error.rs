//! Error types for listing-photo-dl
//!
//! Every stage of a run has its own variant so callers can tell which step
//! failed:
//! - Listing fetch errors live directly on [`Error`]
//! - Per-request failures (transport, status, retry exhaustion) are [`RequestError`]
//! - Per-listing photo failures are [`DownloadError`], collected into
//!   [`DownloadFailures`] when the aggregate run fails
//!
//! [`ErrorKind`] and `error_code()` give each stage a stable machine-readable tag.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

use crate::transport::TransportError;

/// Result type alias for listing-photo-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for listing-photo-dl
#[derive(Debug, Error)]
pub enum Error {
    /// The listings request could not be built (cancelled token, bad base URL)
    #[error("error creating houses request: {0}")]
    CreatingHousesRequest(String),

    /// The listings request failed
    #[error("error getting houses: {0}")]
    GettingHouses(#[source] RequestError),

    /// The listings response body could not be read
    #[error("error reading response body: {0}")]
    ReadingResponseBody(#[source] std::io::Error),

    /// The listings response body is not the expected JSON shape
    #[error("error unmarshalling response body: {0}")]
    UnmarshallingResponse(#[source] serde_json::Error),

    /// The API kept answering `ok=false` until the configured poll cap
    #[error("listings still not ready after {polls} polls")]
    ListingsNotReady {
        /// Number of responses received with `ok=false`
        polls: u32,
    },

    /// One or more photo downloads failed
    #[error("error downloading image to file: {0}")]
    DownloadingImageToFile(#[source] DownloadFailures),

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "api.base_url")
        key: Option<String>,
    },

    /// I/O error outside of a specific download stage (e.g. reading a config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a single HTTP exchange did not produce a usable 2xx response
#[derive(Debug, Error)]
pub enum RequestError {
    /// The transport could not complete the exchange
    #[error("{0}")]
    Transport(#[from] TransportError),

    /// The server answered with a status that is not retried (4xx) or a
    /// transient status that is still pending a retry decision
    #[error("status code: {0}")]
    Status(u16),

    /// Transient statuses persisted past the retry budget
    #[error("API not available")]
    ApiUnavailable,

    /// The cancellation token fired while the request was in flight
    #[error("operation cancelled")]
    Cancelled,
}

/// Per-listing photo download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The photo request could not be built (cancelled token, bad photo URL)
    #[error("error creating image request: {0}")]
    CreatingImageRequest(String),

    /// The photo request failed
    #[error("error getting image: {0}")]
    GettingImage(#[source] RequestError),

    /// The destination could not be created
    #[error("error creating file for image {}: {source}", path.display())]
    CreatingFile {
        /// Destination path relative to the sink root
        path: PathBuf,
        /// Underlying sink error
        #[source]
        source: std::io::Error,
    },

    /// The photo bytes could not be streamed into the destination
    #[error("error copying image data to file {}: {source}", path.display())]
    CopyingDataToFile {
        /// Destination path relative to the sink root
        path: PathBuf,
        /// Underlying stream or sink error
        #[source]
        source: std::io::Error,
    },

    /// The download task panicked or was aborted before reporting an outcome
    #[error("download task failed: {0}")]
    TaskFailed(String),
}

/// A failed photo download together with the listing it belongs to
#[derive(Debug)]
pub struct ItemFailure {
    /// Listing identifier
    pub listing_id: i64,
    /// Listing display address
    pub address: String,
    /// Stage error
    pub error: DownloadError,
}

/// Every failed download of an aggregate run, in listing order
///
/// Never empty: it is only built when at least one task failed.
#[derive(Debug)]
pub struct DownloadFailures {
    failures: Vec<ItemFailure>,
}

impl DownloadFailures {
    pub(crate) fn new(failures: Vec<ItemFailure>) -> Option<Self> {
        if failures.is_empty() {
            None
        } else {
            Some(Self { failures })
        }
    }

    /// The first failure in listing order
    pub fn first(&self) -> &ItemFailure {
        &self.failures[0]
    }

    /// All failures in listing order
    pub fn failures(&self) -> &[ItemFailure] {
        &self.failures
    }

    /// Number of failed listings
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Always false; present for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Identifiers of the failed listings
    pub fn listing_ids(&self) -> Vec<i64> {
        self.failures.iter().map(|f| f.listing_id).collect()
    }
}

impl fmt::Display for DownloadFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let first = self.first();
        write!(f, "listing {}: {}", first.listing_id, first.error)?;
        if self.failures.len() > 1 {
            write!(f, " (and {} more failed)", self.failures.len() - 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for DownloadFailures {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.first().error)
    }
}

/// Stable tag for the stage at which a run failed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Building the listings request
    CreatingHousesRequest,
    /// Sending the listings request
    GettingHouses,
    /// Reading the listings body
    ReadingResponseBody,
    /// Parsing the listings body
    UnmarshallingResponse,
    /// Readiness poll cap reached
    ListingsNotReady,
    /// Aggregate photo download failure
    DownloadingImageToFile,
    /// Building a photo request
    CreatingImageRequest,
    /// Sending a photo request
    GettingImage,
    /// Creating the destination
    CreatingFile,
    /// Streaming into the destination
    CopyingDataToFile,
    /// Download task did not report
    TaskFailed,
    /// Invalid configuration
    Config,
    /// Other I/O failure
    Io,
}

impl Error {
    /// Stage at which this error was raised
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CreatingHousesRequest(_) => ErrorKind::CreatingHousesRequest,
            Error::GettingHouses(_) => ErrorKind::GettingHouses,
            Error::ReadingResponseBody(_) => ErrorKind::ReadingResponseBody,
            Error::UnmarshallingResponse(_) => ErrorKind::UnmarshallingResponse,
            Error::ListingsNotReady { .. } => ErrorKind::ListingsNotReady,
            Error::DownloadingImageToFile(_) => ErrorKind::DownloadingImageToFile,
            Error::Config { .. } => ErrorKind::Config,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Machine-readable error code, including the wrapped cause
    ///
    /// Aggregate failures report the code of their first item failure.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::CreatingHousesRequest(_) => "creating_houses_request",
            Error::GettingHouses(RequestError::ApiUnavailable) => "api_unavailable",
            Error::GettingHouses(RequestError::Cancelled) => "cancelled",
            Error::GettingHouses(_) => "getting_houses",
            Error::ReadingResponseBody(_) => "reading_response_body",
            Error::UnmarshallingResponse(_) => "unmarshalling_response",
            Error::ListingsNotReady { .. } => "listings_not_ready",
            Error::DownloadingImageToFile(failures) => failures.first().error.error_code(),
            Error::Config { .. } => "config_error",
            Error::Io(_) => "io_error",
        }
    }

    /// The request-level cause, if this is a listings request failure
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            Error::GettingHouses(e) => Some(e),
            _ => None,
        }
    }

    /// The per-listing failures, if this is an aggregate download failure
    pub fn download_failures(&self) -> Option<&DownloadFailures> {
        match self {
            Error::DownloadingImageToFile(failures) => Some(failures),
            _ => None,
        }
    }
}

impl DownloadError {
    /// Stage at which this download failed
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::CreatingImageRequest(_) => ErrorKind::CreatingImageRequest,
            DownloadError::GettingImage(_) => ErrorKind::GettingImage,
            DownloadError::CreatingFile { .. } => ErrorKind::CreatingFile,
            DownloadError::CopyingDataToFile { .. } => ErrorKind::CopyingDataToFile,
            DownloadError::TaskFailed(_) => ErrorKind::TaskFailed,
        }
    }

    /// Machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            DownloadError::CreatingImageRequest(_) => "creating_image_request",
            DownloadError::GettingImage(RequestError::ApiUnavailable) => "api_unavailable",
            DownloadError::GettingImage(RequestError::Cancelled) => "cancelled",
            DownloadError::GettingImage(_) => "getting_image",
            DownloadError::CreatingFile { .. } => "creating_file",
            DownloadError::CopyingDataToFile { .. } => "copying_data_to_file",
            DownloadError::TaskFailed(_) => "task_failed",
        }
    }

    /// The request-level cause, if the photo request failed
    pub fn request_error(&self) -> Option<&RequestError> {
        match self {
            DownloadError::GettingImage(e) => Some(e),
            _ => None,
        }
    }
}

impl RequestError {
    /// HTTP status carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            RequestError::Status(code) => Some(*code),
            _ => None,
        }
    }
}
