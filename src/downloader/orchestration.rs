//! Fan-out of per-listing downloads and fail-together aggregation

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::PhotoDownloader;
use crate::error::{DownloadError, DownloadFailures, Error, ItemFailure, Result};
use crate::types::{DownloadSummary, ListingRecord};

impl PhotoDownloader {
    /// Download every listing's photo concurrently
    ///
    /// Spawns one task per listing and waits for all of them. A failing task
    /// never cancels its siblings. Succeeds only if every task succeeded;
    /// otherwise returns [`Error::DownloadingImageToFile`] holding every
    /// failure in listing order.
    ///
    /// Fan-out is unbounded unless `download.max_concurrent_downloads` is set,
    /// in which case extra tasks wait for a permit before sending anything.
    pub async fn download_all(
        &self,
        cancel: &CancellationToken,
        records: Vec<ListingRecord>,
    ) -> Result<DownloadSummary> {
        if let Err(e) = self.sink.prepare().await {
            tracing::warn!(error = %e, "Could not prepare output directory");
        }

        let limiter = self
            .config
            .download
            .max_concurrent_downloads
            .map(|permits| Arc::new(Semaphore::new(permits)));

        let total = records.len();
        let mut tasks = Vec::with_capacity(total);
        for record in records {
            let listing_id = record.id;
            let address = record.address.clone();
            let downloader = self.clone();
            let cancel = cancel.clone();
            let limiter = limiter.clone();

            let handle = tokio::spawn(async move {
                let _permit = match limiter {
                    Some(semaphore) => match semaphore.acquire_owned().await {
                        Ok(permit) => Some(permit),
                        Err(e) => return Err(DownloadError::TaskFailed(e.to_string())),
                    },
                    None => None,
                };
                downloader.download_one(&cancel, record).await
            });
            tasks.push((listing_id, address, handle));
        }

        let mut photos = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (listing_id, address, handle) in tasks {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(DownloadError::TaskFailed(e.to_string())),
            };
            match outcome {
                Ok(photo) => photos.push(photo),
                Err(error) => {
                    tracing::error!(
                        listing_id = listing_id,
                        address = %address,
                        error = %error,
                        "Photo download failed"
                    );
                    failures.push(ItemFailure {
                        listing_id,
                        address,
                        error,
                    });
                }
            }
        }

        if let Some(failures) = DownloadFailures::new(failures) {
            tracing::error!(
                failed = failures.len(),
                succeeded = photos.len(),
                total = total,
                "Some photo downloads failed"
            );
            return Err(Error::DownloadingImageToFile(failures));
        }

        let summary = DownloadSummary { photos };
        tracing::info!(
            photos = summary.len(),
            bytes = summary.total_bytes(),
            "Downloaded all listing photos"
        );
        Ok(summary)
    }
}
