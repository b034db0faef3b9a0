//! Core types: listing records, the listings envelope and download outcomes

use serde::de::{Error as _, Unexpected};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::DownloadError;

/// One real-estate listing as returned by the API
///
/// Fields missing from the JSON fall back to their zero value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingRecord {
    /// Identifier, unique within one fetch
    pub id: i64,
    /// Display address; used verbatim in the destination file name
    pub address: String,
    /// Owner name
    pub homeowner: String,
    /// Asking price
    pub price: i64,
    /// Absolute URL of the listing photo
    #[serde(rename = "photoURL")]
    pub photo_url: String,
}

impl ListingRecord {
    /// Destination of this listing's photo, relative to the sink root
    ///
    /// `<id>-<address><ext>`, where `<ext>` is the extension of the last path
    /// segment of the photo URL including the dot, or empty. The address is
    /// not sanitised: a separator in it yields a nested path.
    pub fn destination_path(&self) -> PathBuf {
        PathBuf::from(format!(
            "{}-{}{}",
            self.id,
            self.address,
            photo_extension(&self.photo_url)
        ))
    }
}

/// Extension (with leading dot) of the last segment of a URL's path
///
/// Query strings and fragments are ignored. Returns an empty string when the
/// last segment has no dot or the URL does not parse.
pub fn photo_extension(photo_url: &str) -> String {
    let Ok(url) = url::Url::parse(photo_url) else {
        return String::new();
    };
    let path = url.path();
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    match last_segment.rfind('.') {
        Some(idx) => last_segment[idx..].to_string(),
        None => String::new(),
    }
}

/// Listings endpoint envelope
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingsResponse {
    /// Listings, in API order
    pub houses: Vec<ListingRecord>,
    /// False while the API is still preparing data
    pub ok: bool,
    /// Optional status message
    pub message: Option<String>,
}

impl ListingsResponse {
    /// Parse a listings body
    ///
    /// The body must be a JSON object. Sequences are rejected even though the
    /// derived struct visitor would accept them positionally.
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let value: Value = serde_json::from_slice(body)?;
        if !value.is_object() {
            return Err(serde_json::Error::invalid_type(
                unexpected(&value),
                &"a listings object",
            ));
        }
        serde_json::from_value(value)
    }
}

fn unexpected(value: &Value) -> Unexpected<'_> {
    match value {
        Value::Null => Unexpected::Unit,
        Value::Bool(b) => Unexpected::Bool(*b),
        Value::Number(_) => Unexpected::Other("number"),
        Value::String(s) => Unexpected::Str(s),
        Value::Array(_) => Unexpected::Seq,
        Value::Object(_) => Unexpected::Map,
    }
}

/// A photo that was written successfully
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SavedPhoto {
    /// Listing the photo belongs to
    pub listing_id: i64,
    /// Destination path relative to the sink root
    pub path: PathBuf,
    /// Bytes written
    pub bytes: u64,
}

/// Result of downloading one listing's photo
pub type DownloadOutcome = std::result::Result<SavedPhoto, DownloadError>;

/// Successful aggregate of a download run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DownloadSummary {
    /// Saved photos in listing order
    pub photos: Vec<SavedPhoto>,
}

impl DownloadSummary {
    /// Total bytes written across all photos
    pub fn total_bytes(&self) -> u64 {
        self.photos.iter().map(|p| p.bytes).sum()
    }

    /// Number of photos written
    pub fn len(&self) -> usize {
        self.photos.len()
    }

    /// True when there were no listings to download
    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}
