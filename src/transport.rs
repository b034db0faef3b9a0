//! HTTP transport capability
//!
//! The fetcher and the item downloader only ever need one operation from the
//! network: send a request, get back a status and a streaming body. That
//! operation is the [`Transport`] trait, so tests can script responses and
//! embedders can bring their own client. [`ReqwestTransport`] is the default
//! implementation.

use async_trait::async_trait;
use futures::StreamExt;
use std::fmt;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;
use url::Url;

use crate::config::HttpConfig;

/// Streaming response body
pub type ResponseBody = Box<dyn AsyncRead + Send + Unpin>;

/// Transport-level failure (connection refused, TLS, timeout, ...)
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error raised by the reqwest client
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Error raised by any other transport implementation
    #[error("transport error: {0}")]
    Other(String),
}

/// An outgoing request
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// HTTP method
    pub method: reqwest::Method,
    /// Absolute request URL
    pub url: Url,
}

impl HttpRequest {
    /// Build a GET request
    pub fn get(url: Url) -> Self {
        Self {
            method: reqwest::Method::GET,
            url,
        }
    }
}

/// A response whose body has not been read yet
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Body stream
    pub body: ResponseBody,
}

impl HttpResponse {
    /// Wrap an in-memory body
    pub fn from_bytes(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: Box::new(std::io::Cursor::new(body.into())),
        }
    }

    /// 2xx
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// The single network operation the core relies on
///
/// Implementations own their connection pooling, TLS and timeouts. Any state
/// they keep (call counters in test doubles, for example) stays private.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and return the response head with a streaming body
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest::Client`
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with the configured user agent and timeout
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .request(request.method, request.url)
            .send()
            .await?;
        let status = response.status().as_u16();
        let stream = Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(std::io::Error::other)),
        );

        Ok(HttpResponse {
            status,
            body: Box::new(StreamReader::new(stream)),
        })
    }
}
