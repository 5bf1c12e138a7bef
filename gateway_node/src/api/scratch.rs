//! Per-request scratch files for dataset downloads.

use axum::body::Body;
use futures::StreamExt;
use std::io;
use std::path::Path;
use tempfile::TempPath;
use tokio_util::io::ReaderStream;

/// Uniquely named file in the scratch directory, removed when dropped.
pub struct ScratchFile {
    path: TempPath,
}

impl ScratchFile {
    /// Reserve a new file whose name starts with `label`.
    pub fn create(dir: &Path, label: &str) -> io::Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(&format!("{}-", label))
            .tempfile_in(dir)?;
        Ok(Self {
            path: file.into_temp_path(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream the file as a response body. The file is deleted once the body
    /// is finished or dropped.
    pub async fn into_body(self) -> io::Result<Body> {
        let file = tokio::fs::File::open(&self.path).await?;
        let guard = self.path;
        let stream = ReaderStream::new(file).map(move |chunk| {
            let _ = &guard;
            chunk
        });
        Ok(Body::from_stream(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_paths_are_unique_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScratchFile::create(dir.path(), "0xabc").unwrap();
        let b = ScratchFile::create(dir.path(), "0xabc").unwrap();
        assert_ne!(a.path(), b.path());
        assert!(a
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("0xabc-"));
    }

    #[tokio::test]
    async fn test_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create(dir.path(), "drop").unwrap();
        let path = scratch.path().to_path_buf();
        assert!(path.exists());
        drop(scratch);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_removed_after_body_is_consumed() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchFile::create(dir.path(), "body").unwrap();
        tokio::fs::write(scratch.path(), b"dataset bytes").await.unwrap();
        let path = scratch.path().to_path_buf();

        let body = scratch.into_body().await.unwrap();
        assert!(path.exists());
        let bytes = axum::body::to_bytes(body, 1024).await.unwrap();
        assert_eq!(&bytes[..], b"dataset bytes");
        assert!(!path.exists());
    }
}
