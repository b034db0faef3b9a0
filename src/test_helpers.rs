//! Shared test doubles for unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};

use crate::config::Config;
use crate::downloader::PhotoDownloader;
use crate::sink::FileSink;
use crate::transport::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::types::{ListingRecord, ListingsResponse};

/// Path of the listings endpoint under the default configuration
pub(crate) const LISTINGS_PATH: &str = "/api_project/houses";

/// One scripted reply of [`MockTransport`]
#[derive(Clone, Debug)]
pub(crate) enum MockReply {
    /// Status with an in-memory body
    Body { status: u16, body: Vec<u8> },
    /// Status whose body yields `prefix` and then fails
    BrokenBody { status: u16, prefix: Vec<u8> },
    /// Status with a body, returned after a delay
    Delayed {
        delay: Duration,
        status: u16,
        body: Vec<u8>,
    },
    /// Transport-level failure
    Fail(String),
    /// Never completes
    Hang,
}

impl MockReply {
    pub(crate) fn status(status: u16) -> Self {
        MockReply::Body {
            status,
            body: Vec::new(),
        }
    }

    pub(crate) fn ok(body: impl Into<Vec<u8>>) -> Self {
        MockReply::Body {
            status: 200,
            body: body.into(),
        }
    }

    pub(crate) fn json(value: serde_json::Value) -> Self {
        MockReply::ok(value.to_string())
    }
}

/// Transport that replays scripted replies per URL path
///
/// Each path has a queue of replies; the last reply repeats once the queue is
/// down to one entry. Unknown paths fail at the transport level.
#[derive(Default)]
pub(crate) struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<MockReply>>>,
    calls: Mutex<HashMap<String, usize>>,
    total_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn on(self, path: &str, replies: impl IntoIterator<Item = MockReply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(path.to_string(), replies.into_iter().collect());
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.total_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn calls_to(&self, path: &str) -> usize {
        self.calls.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_reply(&self, path: &str) -> Option<MockReply> {
        let mut routes = self.routes.lock().unwrap();
        let queue = routes.get_mut(path)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let path = request.url.path().to_string();
        self.total_calls.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(path.clone()).or_default() += 1;

        let reply = self
            .next_reply(&path)
            .ok_or_else(|| TransportError::Other(format!("no route for {path}")))?;

        match reply {
            MockReply::Body { status, body } => Ok(HttpResponse::from_bytes(status, body)),
            MockReply::BrokenBody { status, prefix } => Ok(HttpResponse {
                status,
                body: Box::new(FailingReader::new(prefix)),
            }),
            MockReply::Delayed {
                delay,
                status,
                body,
            } => {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(HttpResponse::from_bytes(status, body))
            }
            MockReply::Fail(message) => Err(TransportError::Other(message)),
            MockReply::Hang => std::future::pending().await,
        }
    }
}

/// Reader that yields a prefix and then a connection reset
pub(crate) struct FailingReader {
    prefix: io::Cursor<Vec<u8>>,
}

impl FailingReader {
    pub(crate) fn new(prefix: Vec<u8>) -> Self {
        Self {
            prefix: io::Cursor::new(prefix),
        }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if (this.prefix.position() as usize) < this.prefix.get_ref().len() {
            return Pin::new(&mut this.prefix).poll_read(cx, buf);
        }
        Poll::Ready(Err(io::Error::new(
            io::ErrorKind::ConnectionReset,
            "body stream reset",
        )))
    }
}

/// Listing whose photo lives at `http://photos.test/<id>.jpg`
pub(crate) fn listing(id: i64, address: &str) -> ListingRecord {
    ListingRecord {
        id,
        address: address.to_string(),
        homeowner: format!("Owner {id}"),
        price: 100_000 + id,
        photo_url: format!("http://photos.test/{id}.jpg"),
    }
}

/// Ready listings envelope with `count` listings `house-0`, `house-1`, ...
pub(crate) fn listings_json(count: i64) -> MockReply {
    let response = ListingsResponse {
        houses: (0..count).map(|id| listing(id, &format!("house-{id}"))).collect(),
        ok: true,
        message: None,
    };
    MockReply::ok(serde_json::to_vec(&response).unwrap())
}

/// Downloader over `transport` writing into `<tempdir>/tmp`, with short
/// retry and poll delays. `configure` can override any setting.
/// Returns the downloader and the tempdir (which must be kept alive).
pub(crate) fn downloader_with(
    transport: Arc<MockTransport>,
    configure: impl FnOnce(&mut Config),
) -> (PhotoDownloader, tempfile::TempDir) {
    let temp_dir = tempfile::tempdir().unwrap();

    let mut config = Config::default();
    config.api.base_url = "http://api.test".to_string();
    config.download.output_dir = temp_dir.path().join("tmp");
    config.retry.initial_delay = Duration::from_millis(5);
    config.retry.max_delay = Duration::from_millis(5);
    config.readiness.poll_interval = Duration::from_millis(5);
    configure(&mut config);

    let sink = Arc::new(FileSink::new(config.download.output_dir.clone()));
    let downloader = PhotoDownloader::with_capabilities(config, transport, sink);
    (downloader, temp_dir)
}
