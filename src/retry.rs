//! Retry logic for transient HTTP statuses
//!
//! Both the listings request and every photo request go through
//! [`send_with_retry`]: transport errors and 4xx answers fail at once, any
//! other non-2xx status is retried after a delay until the budget in
//! [`RetryConfig`] runs out, at which point the request fails with
//! [`RequestError::ApiUnavailable`].
//!
//! The generic [`retry_with_backoff`] underneath supports exponential backoff
//! with optional jitter; the default configuration keeps a fixed delay.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::error::RequestError;
use crate::transport::{HttpRequest, HttpResponse, Transport};

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RequestError {
    fn is_retryable(&self) -> bool {
        match self {
            RequestError::Status(code) => is_transient_status(*code),
            RequestError::Transport(_) | RequestError::ApiUnavailable | RequestError::Cancelled => {
                false
            }
        }
    }
}

/// Marker returned when the cancellation token fires between attempts
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cancelled;

impl From<Cancelled> for RequestError {
    fn from(_: Cancelled) -> Self {
        RequestError::Cancelled
    }
}

/// Anything outside 2xx and 4xx
pub fn is_transient_status(status: u16) -> bool {
    !(200..300).contains(&status) && !(400..500).contains(&status)
}

/// Execute an async operation, retrying retryable errors with backoff
///
/// `config.max_attempts` counts retries, so the operation runs at most
/// `max_attempts + 1` times. Returns the successful result, the first
/// non-retryable error, or the last retryable error once the budget is spent.
/// Cancelling `cancel` interrupts the delay between attempts.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + From<Cancelled> + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::select! {
                    _ = cancel.cancelled() => return Err(Cancelled.into()),
                    _ = tokio::time::sleep(jittered_delay) => {}
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Operation failed after all retry attempts exhausted"
                    );
                } else {
                    tracing::debug!(error = %e, "Operation failed with non-retryable error");
                }
                return Err(e);
            }
        }
    }
}

/// Send `request` until it yields a 2xx response or a terminal error
///
/// The transport call itself is raced against `cancel`.
pub async fn send_with_retry(
    transport: &dyn Transport,
    request: &HttpRequest,
    config: &RetryConfig,
    cancel: &CancellationToken,
) -> Result<HttpResponse, RequestError> {
    let result = retry_with_backoff(config, cancel, || {
        let request = request.clone();
        async move {
            let response = tokio::select! {
                _ = cancel.cancelled() => return Err(RequestError::Cancelled),
                response = transport.execute(request) => response?,
            };
            if response.is_success() {
                Ok(response)
            } else {
                Err(RequestError::Status(response.status))
            }
        }
    })
    .await;

    match result {
        Err(e) if e.is_retryable() => {
            tracing::warn!(url = %request.url, error = %e, "Retry budget exhausted");
            Err(RequestError::ApiUnavailable)
        }
        other => other,
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
