//! Command-line entry point: download the photos of the first listings page.
//!
//! Usage: `listing-photo-dl [CONFIG.json]`. Log verbosity follows `RUST_LOG`
//! (default `info`).

use anyhow::Context;
use listing_photo_dl::{Config, PhotoDownloader, run_with_shutdown};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let start = Instant::now();

    let config = match std::env::args_os().nth(1) {
        Some(path) => Config::from_json_file(&path)
            .with_context(|| format!("loading configuration from {}", path.to_string_lossy()))?,
        None => Config::default(),
    };
    let downloader = PhotoDownloader::new(config).context("initialising downloader")?;

    let summary = run_with_shutdown(&downloader).await?;

    tracing::info!(
        photos = summary.len(),
        bytes = summary.total_bytes(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Finished"
    );
    Ok(())
}
