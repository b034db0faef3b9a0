//! Configuration types for listing-photo-dl
//!
//! Every field has a default, so `Config::default()` reproduces the reference
//! behaviour: page 1 of 10 listings, 4 retries 100ms apart, unbounded readiness
//! polling, unbounded download fan-out, photos written under `tmp/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// Top-level configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listings API location and paging
    #[serde(default)]
    pub api: ApiConfig,

    /// Retry policy for transient HTTP statuses (listings and photos)
    #[serde(default)]
    pub retry: RetryConfig,

    /// Polling policy while the API reports `ok=false`
    #[serde(default)]
    pub readiness: ReadinessConfig,

    /// Photo destination and fan-out
    #[serde(default)]
    pub download: DownloadConfig,

    /// Settings for the default reqwest transport
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Load a configuration from a JSON file; missing fields take their defaults
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {e}", path.display()),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check invariants serde cannot express
    pub fn validate(&self) -> Result<()> {
        if let Err(e) = Url::parse(&self.api.base_url) {
            return Err(Error::Config {
                message: format!("invalid base URL {:?}: {e}", self.api.base_url),
                key: Some("api.base_url".to_string()),
            });
        }
        if !self.api.listings_path.starts_with('/') {
            return Err(Error::Config {
                message: "listings path must start with '/'".to_string(),
                key: Some("api.listings_path".to_string()),
            });
        }
        if self.api.per_page == 0 {
            return Err(Error::Config {
                message: "per_page must be at least 1".to_string(),
                key: Some("api.per_page".to_string()),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::Config {
                message: "backoff multiplier must be >= 1.0".to_string(),
                key: Some("retry.backoff_multiplier".to_string()),
            });
        }
        if self.download.max_concurrent_downloads == Some(0) {
            return Err(Error::Config {
                message: "max_concurrent_downloads must be at least 1 when set".to_string(),
                key: Some("download.max_concurrent_downloads".to_string()),
            });
        }
        Ok(())
    }
}

/// Listings API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Scheme and host of the API (default: the staging herokuapp host)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the listings endpoint (default: "/api_project/houses")
    #[serde(default = "default_listings_path")]
    pub listings_path: String,

    /// Page to request (default: 1)
    #[serde(default = "default_page")]
    pub page: u32,

    /// Listings per page (default: 10)
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listings_path: default_listings_path(),
            page: default_page(),
            per_page: default_per_page(),
        }
    }
}

impl ApiConfig {
    /// Full listings URL including the paging query
    pub fn listings_url(&self) -> std::result::Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.base_url)?.join(&self.listings_path)?;
        url.query_pairs_mut()
            .append_pair("page", &self.page.to_string())
            .append_pair("per_page", &self.per_page.to_string());
        Ok(url)
    }
}

/// Retry behavior configuration
///
/// Only transient statuses (anything outside 2xx and 4xx) are retried.
/// The defaults give a fixed 100ms delay; raising `backoff_multiplier` and
/// `max_delay` turns it into exponential backoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt (default: 4)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 100ms)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 100ms)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 1.0, i.e. fixed delay)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_retry_delay(),
            max_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// Polling while the listings payload is still being prepared
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReadinessConfig {
    /// Delay between polls (default: 100ms)
    #[serde(default = "default_poll_interval", with = "duration_ms_serde")]
    pub poll_interval: Duration,

    /// Give up after this many `ok=false` responses (default: None = poll forever)
    #[serde(default)]
    pub max_polls: Option<u32>,
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            max_polls: None,
        }
    }
}

/// Photo destination and fan-out configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory photos are written to (default: "tmp")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Cap on simultaneously active downloads (default: None = one per listing)
    #[serde(default)]
    pub max_concurrent_downloads: Option<usize>,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            max_concurrent_downloads: None,
        }
    }
}

/// reqwest client settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User-Agent header (default: "listing-photo-dl/<version>")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Whole-request timeout (default: 30s)
    #[serde(default = "default_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "http://app-homevision-staging.herokuapp.com".to_string()
}

fn default_listings_path() -> String {
    "/api_project/houses".to_string()
}

fn default_page() -> u32 {
    1
}

fn default_per_page() -> u32 {
    10
}

fn default_max_attempts() -> u32 {
    4
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(100)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(100)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("tmp")
}

fn default_user_agent() -> String {
    concat!("listing-photo-dl/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout() -> Duration {
    Duration::from_secs(30)
}

// Durations are written as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
