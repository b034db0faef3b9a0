//! Listing fetch: status retries plus readiness polling

use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

use super::PhotoDownloader;
use crate::error::{Error, RequestError, Result};
use crate::retry::send_with_retry;
use crate::transport::HttpRequest;
use crate::types::ListingsResponse;

impl PhotoDownloader {
    /// Build the listings request
    ///
    /// Fails with [`Error::CreatingHousesRequest`] when `cancel` has already
    /// fired or the configured base URL is invalid.
    pub fn listings_request(&self, cancel: &CancellationToken) -> Result<HttpRequest> {
        if cancel.is_cancelled() {
            return Err(Error::CreatingHousesRequest(
                "operation already cancelled".to_string(),
            ));
        }
        let url = self
            .config
            .api
            .listings_url()
            .map_err(|e| Error::CreatingHousesRequest(e.to_string()))?;
        Ok(HttpRequest::get(url))
    }

    /// Fetch the listings page, polling until the API reports `ok=true`
    ///
    /// Each poll is a complete request with its own status-retry budget.
    /// Polling is unbounded unless `readiness.max_polls` is set.
    pub async fn fetch(&self, cancel: &CancellationToken) -> Result<ListingsResponse> {
        let request = self.listings_request(cancel)?;
        let readiness = &self.config.readiness;
        let mut polls: u32 = 0;

        loop {
            let listings = self.fetch_once(&request, cancel).await?;
            if listings.ok {
                tracing::info!(
                    listings = listings.houses.len(),
                    polls = polls + 1,
                    "Fetched listings"
                );
                return Ok(listings);
            }

            polls += 1;
            tracing::warn!(
                polls = polls,
                message = listings.message.as_deref().unwrap_or(""),
                "Listings not ready yet"
            );
            if let Some(max_polls) = readiness.max_polls
                && polls >= max_polls
            {
                return Err(Error::ListingsNotReady { polls });
            }

            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::GettingHouses(RequestError::Cancelled)),
                _ = tokio::time::sleep(readiness.poll_interval) => {}
            }
        }
    }

    async fn fetch_once(
        &self,
        request: &HttpRequest,
        cancel: &CancellationToken,
    ) -> Result<ListingsResponse> {
        let mut response = send_with_retry(
            self.transport.as_ref(),
            request,
            &self.config.retry,
            cancel,
        )
        .await
        .map_err(Error::GettingHouses)?;

        let mut body = Vec::new();
        response
            .body
            .read_to_end(&mut body)
            .await
            .map_err(Error::ReadingResponseBody)?;

        ListingsResponse::from_json(&body).map_err(Error::UnmarshallingResponse)
    }
}
