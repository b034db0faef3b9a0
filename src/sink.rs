//! Destination for downloaded photos
//!
//! [`Sink`] is the capability the item downloader writes through: `create`
//! opens a writable handle for a relative path and `copy` streams a response
//! body into it. [`FileSink`] is the local filesystem implementation.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Writable handle returned by [`Sink::create`]
pub type SinkHandle = Box<dyn AsyncWrite + Send + Unpin>;

/// Where downloaded bytes are durably written
#[async_trait]
pub trait Sink: Send + Sync {
    /// Prepare the sink before any download starts
    ///
    /// Called once per run. The default does nothing.
    async fn prepare(&self) -> io::Result<()> {
        Ok(())
    }

    /// Open `path` for writing, replacing any previous content
    async fn create(&self, path: &Path) -> io::Result<SinkHandle>;

    /// Stream `source` into `handle` and return the number of bytes written
    async fn copy(
        &self,
        source: &mut (dyn AsyncRead + Send + Unpin),
        handle: &mut SinkHandle,
    ) -> io::Result<u64> {
        let written = tokio::io::copy(source, handle).await?;
        handle.flush().await?;
        handle.shutdown().await?;
        Ok(written)
    }
}

/// Filesystem sink rooted at a directory
#[derive(Clone, Debug)]
pub struct FileSink {
    root: PathBuf,
}

impl FileSink {
    /// Sink writing under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl Sink for FileSink {
    /// Create the root directory; an existing directory is fine
    ///
    /// Only the root itself is created, never its parents or any directory
    /// implied by a listing address.
    async fn prepare(&self) -> io::Result<()> {
        match tokio::fs::create_dir(&self.root).await {
            Ok(()) => {
                tracing::debug!(root = %self.root.display(), "Created output directory");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Ok(()),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, path: &Path) -> io::Result<SinkHandle> {
        let file = tokio::fs::File::create(self.root.join(path)).await?;
        Ok(Box::new(file))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FailingReader;

    #[tokio::test]
    async fn prepare_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("tmp"));

        sink.prepare().await.unwrap();
        sink.prepare().await.unwrap();
        assert!(sink.root().is_dir());
    }

    #[tokio::test]
    async fn prepare_does_not_create_parents() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path().join("missing").join("tmp"));

        let err = sink.prepare().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn create_and_copy_write_exact_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let mut handle = sink.create(Path::new("1-house-1.jpg")).await.unwrap();
        let mut body = io::Cursor::new(b"photo".to_vec());
        let written = sink.copy(&mut body, &mut handle).await.unwrap();

        assert_eq!(written, 5);
        assert_eq!(std::fs::read(dir.path().join("1-house-1.jpg")).unwrap(), b"photo");
    }

    #[tokio::test]
    async fn create_truncates_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());
        std::fs::write(dir.path().join("1-a.jpg"), b"a much longer old payload").unwrap();

        let mut handle = sink.create(Path::new("1-a.jpg")).await.unwrap();
        sink.copy(&mut io::Cursor::new(b"new".to_vec()), &mut handle)
            .await
            .unwrap();

        assert_eq!(std::fs::read(dir.path().join("1-a.jpg")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn create_fails_when_address_implies_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let err = sink.create(Path::new("2-house/2.jpg")).await.err().unwrap();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn copy_surfaces_source_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::new(dir.path());

        let mut handle = sink.create(Path::new("3-x.jpg")).await.unwrap();
        let mut body = FailingReader::new(b"partial".to_vec());
        let err = sink.copy(&mut body, &mut handle).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::ConnectionReset);
    }
}
