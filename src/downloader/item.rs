//! Single photo download

use tokio_util::sync::CancellationToken;
use url::Url;

use super::PhotoDownloader;
use crate::error::DownloadError;
use crate::retry::send_with_retry;
use crate::transport::HttpRequest;
use crate::types::{DownloadOutcome, ListingRecord, SavedPhoto};

impl PhotoDownloader {
    /// Download one listing's photo into the sink
    ///
    /// Uses the same status-retry policy as the listings fetch but has no
    /// readiness polling. The destination is
    /// [`ListingRecord::destination_path`], overwritten if it already exists.
    pub async fn download_one(
        &self,
        cancel: &CancellationToken,
        record: ListingRecord,
    ) -> DownloadOutcome {
        if cancel.is_cancelled() {
            return Err(DownloadError::CreatingImageRequest(
                "operation already cancelled".to_string(),
            ));
        }
        let url = Url::parse(&record.photo_url).map_err(|e| {
            DownloadError::CreatingImageRequest(format!(
                "invalid photo URL {:?}: {e}",
                record.photo_url
            ))
        })?;
        let request = HttpRequest::get(url);

        let mut response = send_with_retry(
            self.transport.as_ref(),
            &request,
            &self.config.retry,
            cancel,
        )
        .await
        .map_err(DownloadError::GettingImage)?;

        let path = record.destination_path();
        let mut handle = self
            .sink
            .create(&path)
            .await
            .map_err(|source| DownloadError::CreatingFile {
                path: path.clone(),
                source,
            })?;

        let bytes = self
            .sink
            .copy(&mut *response.body, &mut handle)
            .await
            .map_err(|source| DownloadError::CopyingDataToFile {
                path: path.clone(),
                source,
            })?;

        tracing::debug!(
            listing_id = record.id,
            path = %path.display(),
            bytes = bytes,
            "Saved listing photo"
        );

        Ok(SavedPhoto {
            listing_id: record.id,
            path,
            bytes,
        })
    }
}
