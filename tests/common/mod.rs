//! Common test utilities for listing-photo-dl integration tests

use listing_photo_dl::{Config, PhotoDownloader};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

/// Listings endpoint path
pub const LISTINGS_PATH: &str = "/api_project/houses";

/// Matcher for the listings request the downloader sends
pub fn listings_request() -> MockBuilder {
    Mock::given(method("GET"))
        .and(path(LISTINGS_PATH))
        .and(query_param("page", "1"))
        .and(query_param("per_page", "10"))
}

/// One listing JSON object whose photo is served by `server`
pub fn listing_json(server: &MockServer, id: i64, address: &str) -> Value {
    json!({
        "id": id,
        "address": address,
        "homeowner": format!("Owner {id}"),
        "price": 150_000 + id,
        "photoURL": format!("{}/photos/{id}.jpg", server.uri()),
    })
}

/// Ready listings envelope
pub fn ready(houses: Vec<Value>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "houses": houses, "ok": true }))
}

/// Envelope the API sends while data is being prepared
pub fn not_ready() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ok": false, "message": "preparing" }))
}

/// Serve `body` as the photo of listing `id`
pub async fn mount_photo(server: &MockServer, id: i64, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(format!("/photos/{id}.jpg")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Downloader pointed at `server`, writing into `<tempdir>/tmp`, with short
/// retry delays. Returns the downloader, the tempdir (which must be kept
/// alive) and the output directory.
pub fn create_test_downloader(
    server: &MockServer,
    configure: impl FnOnce(&mut Config),
) -> (PhotoDownloader, TempDir, PathBuf) {
    let temp_dir = tempfile::tempdir().expect("create temp dir");
    let output_dir = temp_dir.path().join("tmp");

    let mut config = Config::default();
    config.api.base_url = server.uri();
    config.download.output_dir = output_dir.clone();
    config.retry.initial_delay = Duration::from_millis(10);
    config.retry.max_delay = Duration::from_millis(10);
    config.readiness.poll_interval = Duration::from_millis(10);
    configure(&mut config);

    let downloader = PhotoDownloader::new(config).expect("valid test config");
    (downloader, temp_dir, output_dir)
}
