//! # Remote File Handle
//!
//! [`RemoteFile`] is what a successful transfer hands back: the staged chunk
//! files composed into one sequential [`AsyncRead`] stream in ascending chunk
//! order, plus file metadata. Closing the handle releases the chunk files and
//! removes the staging directory.

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tracing::{debug, warn};
use url::Url;

use crate::DownloadError;
use crate::staging::{STAGING_MODE, remove_staging};

/// Metadata of a downloaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    name: String,
    size: u64,
    mode: u32,
    modified: SystemTime,
}

impl FileInfo {
    /// Base name of the URL
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Permission bits, always owner/group-only
    pub fn mode(&self) -> u32 {
        self.mode
    }

    /// When the transfer completed
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    pub fn is_dir(&self) -> bool {
        false
    }
}

/// An open, fully downloaded remote file
#[derive(Debug)]
pub struct RemoteFile {
    url: String,
    name: String,
    size: u64,
    modified: Option<SystemTime>,
    staging: PathBuf,
    readers: Vec<Option<File>>,
    current: usize,
}

impl RemoteFile {
    /// Compose the handle from chunk files in index order. Every file must be
    /// positioned at its start.
    pub(crate) fn new(url: &str, size: u64, staging: PathBuf, readers: Vec<File>) -> Self {
        Self {
            url: url.to_string(),
            name: file_name_from_url(url),
            size,
            modified: Some(SystemTime::now()),
            staging,
            readers: readers.into_iter().map(Some).collect(),
            current: 0,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Directory holding the staged chunk files
    pub fn staging_dir(&self) -> &Path {
        &self.staging
    }

    /// Metadata of the downloaded file.
    ///
    /// Fails with [`DownloadError::BadDescriptor`] once the handle is closed.
    pub fn stat(&self) -> Result<FileInfo, DownloadError> {
        let Some(modified) = self.modified else {
            return Err(DownloadError::BadDescriptor {
                op: "stat",
                path: self.name.clone(),
            });
        };

        Ok(FileInfo {
            name: self.name.clone(),
            size: self.size,
            mode: STAGING_MODE,
            modified,
        })
    }

    /// Release every chunk file and remove the staging directory.
    ///
    /// Removal is attempted on every call; metadata queries keep failing
    /// after the first one.
    pub async fn close(&mut self) -> Result<(), DownloadError> {
        // Entries may already be gone from a previous close
        for reader in self.readers.iter_mut() {
            reader.take();
        }
        self.current = self.readers.len();
        self.modified = None;

        debug!(url = %self.url, dir = %self.staging.display(), "Removing staging directory");
        remove_staging(&self.staging).await?;
        Ok(())
    }
}

impl AsyncRead for RemoteFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        while this.current < this.readers.len() {
            let Some(reader) = this.readers[this.current].as_mut() else {
                this.current += 1;
                continue;
            };

            let filled = buf.filled().len();
            match Pin::new(reader).poll_read(cx, buf) {
                Poll::Ready(Ok(())) => {
                    if buf.filled().len() > filled || buf.remaining() == 0 {
                        return Poll::Ready(Ok(()));
                    }
                    // This chunk is exhausted, move on to the next one
                    this.current += 1;
                }
                other => return other,
            }
        }

        Poll::Ready(Ok(()))
    }
}

impl Drop for RemoteFile {
    fn drop(&mut self) {
        if self.modified.is_none() {
            return;
        }
        self.readers.clear();

        let staging = std::mem::take(&mut self.staging);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(move || remove_staging_blocking(&staging));
            }
            Err(_) => remove_staging_blocking(&staging),
        }
    }
}

fn remove_staging_blocking(staging: &Path) {
    if let Err(e) = std::fs::remove_dir_all(staging) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(dir = %staging.display(), error = %e, "Failed to remove staging directory on drop");
        }
    }
}

/// Last non-empty path segment of `url`.
pub fn file_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            let trimmed = url.trim_end_matches('/');
            trimmed.rsplit('/').next().unwrap_or(trimmed).to_string()
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::SeekFrom;
    use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

    async fn staged_file(path: PathBuf, contents: &[u8]) -> File {
        let mut file = tokio::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .await
            .unwrap();
        file.write_all(contents).await.unwrap();
        file.flush().await.unwrap();
        file.seek(SeekFrom::Start(0)).await.unwrap();
        file
    }

    async fn handle(root: &std::path::Path, parts: &[&[u8]]) -> RemoteFile {
        let staging = root.join("staging");
        tokio::fs::create_dir_all(&staging).await.unwrap();

        let mut readers = Vec::new();
        for (i, part) in parts.iter().enumerate() {
            readers.push(staged_file(staging.join(i.to_string()), part).await);
        }
        let size = parts.iter().map(|p| p.len() as u64).sum();
        RemoteFile::new("http://example.com/files/data.txt", size, staging, readers)
    }

    #[tokio::test]
    async fn test_reads_chunks_in_order() {
        let root = tempfile::tempdir().unwrap();
        let mut file = handle(root.path(), &[b"abc", b"", b"def", b"g"]).await;

        let mut out = Vec::new();
        file.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"abcdefg");

        // Stays at end of stream
        let mut buf = [0u8; 4];
        assert_eq!(file.read(&mut buf).await.unwrap(), 0);
        file.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_stat_then_close() {
        let root = tempfile::tempdir().unwrap();
        let mut file = handle(root.path(), &[b"hello", b"world"]).await;
        let staging = file.staging_dir().to_path_buf();

        let info = file.stat().unwrap();
        assert_eq!(info.name(), "data.txt");
        assert_eq!(info.len(), 10);
        assert_eq!(info.mode(), 0o770);
        assert!(!info.is_dir());
        assert!(info.modified() <= SystemTime::now());

        file.close().await.unwrap();
        assert!(!staging.exists());

        let err = file.stat().unwrap_err();
        assert!(matches!(err, DownloadError::BadDescriptor { op: "stat", .. }));
        assert_eq!(err.to_string(), "stat data.txt: bad file descriptor");

        // Second close still succeeds and stat keeps failing
        file.close().await.unwrap();
        assert!(file.stat().is_err());
    }

    #[tokio::test]
    async fn test_drop_removes_staging() {
        let root = tempfile::tempdir().unwrap();
        let file = handle(root.path(), &[b"x"]).await;
        let staging = file.staging_dir().to_path_buf();

        // Removal runs on the blocking pool
        drop(file);
        for _ in 0..100 {
            if !staging.exists() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        assert!(!staging.exists());
    }

    #[test]
    fn test_drop_outside_runtime_removes_staging() {
        let root = tempfile::tempdir().unwrap();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let file = runtime.block_on(handle(root.path(), &[b"x"]));
        let staging = file.staging_dir().to_path_buf();

        drop(runtime);
        drop(file);
        assert!(!staging.exists());
    }

    #[test]
    fn test_file_name_from_url() {
        assert_eq!(file_name_from_url("http://example.com/a/b/archive.zip"), "archive.zip");
        assert_eq!(file_name_from_url("http://example.com/a/image.png?q=1"), "image.png");
        assert_eq!(file_name_from_url("http://example.com/dir/"), "dir");
        assert_eq!(file_name_from_url("not a url/name.bin"), "name.bin");
    }
}
