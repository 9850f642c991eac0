//! # Chunk Worker
//!
//! Materializes one planned chunk as a readable staging file. When resuming,
//! a staging file that already has the full chunk length is reused without
//! touching the network, and a shorter one is completed by requesting only the
//! missing tail. Length is the only completeness check: a staging file of the
//! right size is trusted as-is.

use std::io::SeekFrom;
use std::path::Path;
use std::sync::Arc;

use reqwest::header::RANGE;
use reqwest::{Client, StatusCode};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::DownloadError;
use crate::bytes_stream::{BytesStreamReader, into_download_error};
use crate::config::BoxReader;
use crate::context::DownloadContext;
use crate::downloader::Transfer;
use crate::planner::Chunk;
use crate::staging::StagingDir;

const COPY_BUFFER_SIZE: usize = 64 * 1024;

/// Outcome of one chunk, sent to the aggregator exactly once
#[derive(Debug)]
pub(crate) struct ChunkResult {
    pub index: usize,
    pub result: Result<File, DownloadError>,
}

pub(crate) struct ChunkWorker {
    client: Client,
    transfer: Arc<Transfer>,
    staging: StagingDir,
    resume: bool,
}

impl ChunkWorker {
    pub(crate) fn new(
        client: Client,
        transfer: Arc<Transfer>,
        staging: StagingDir,
        resume: bool,
    ) -> Self {
        Self {
            client,
            transfer,
            staging,
            resume,
        }
    }

    /// Download `chunk` and report the outcome on `results`.
    ///
    /// Nothing is reported once `ctx` has stopped.
    pub(crate) async fn run(
        self,
        ctx: DownloadContext,
        chunk: Chunk,
        results: mpsc::Sender<ChunkResult>,
    ) {
        let result = self.materialize(&ctx, chunk).await;

        if ctx.err().is_some() {
            debug!(index = chunk.index, "Context stopped, dropping chunk result");
            return;
        }

        let message = ChunkResult {
            index: chunk.index,
            result,
        };
        tokio::select! {
            biased;
            _ = ctx.done() => {}
            _ = results.send(message) => {}
        }
    }

    async fn materialize(&self, ctx: &DownloadContext, chunk: Chunk) -> Result<File, DownloadError> {
        let path = self.staging.chunk_path(chunk.index);
        let expected = chunk.len();
        let mut start = chunk.start;

        let mut file = match self.staged_len(&path).await? {
            Some(len) if len == expected => {
                debug!(index = chunk.index, len, "Chunk already staged, skipping request");
                return Ok(File::open(&path).await?);
            }
            Some(len) if len < expected => {
                debug!(index = chunk.index, have = len, expected, "Resuming partial chunk");
                start += len;
                OpenOptions::new()
                    .read(true)
                    .append(true)
                    .open(&path)
                    .await?
            }
            staged => {
                if let Some(len) = staged {
                    warn!(index = chunk.index, len, expected, "Staged chunk is oversized, refetching");
                }
                create_staging_file(&path).await?
            }
        };

        let url = &self.transfer.url;
        let remaining = Chunk { start, ..chunk };
        let request = self
            .client
            .get(url)
            .header(RANGE, remaining.range_header());

        let response = tokio::select! {
            biased;
            reason = ctx.done() => return Err(DownloadError::from_context(reason, url)),
            response = request.send() => response?,
        };

        if response.status() != StatusCode::PARTIAL_CONTENT {
            return Err(DownloadError::InvalidResponseCode {
                got: response.status().as_u16(),
                expected: StatusCode::PARTIAL_CONTENT.as_u16(),
            });
        }

        let label = format!("{}-{}", self.transfer.name, chunk.index);
        let body: BoxReader = Box::new(BytesStreamReader::new(response.bytes_stream()));
        let mut reader = self
            .transfer
            .options
            .wrap(&label, remaining.len(), body);

        let written = stream_to_file(ctx, url, &mut reader, &mut file).await?;
        file.seek(SeekFrom::Start(0)).await?;

        debug!(index = chunk.index, start, end = chunk.end, written, "Chunk complete");
        Ok(file)
    }

    /// Length of the existing staging file, when resuming and one exists.
    async fn staged_len(&self, path: &Path) -> Result<Option<u64>, DownloadError> {
        if !self.resume {
            return Ok(None);
        }
        match fs::metadata(path).await {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

pub(crate) async fn create_staging_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
        .await
}

/// Copy `reader` into `file` until end of stream or until `ctx` stops.
///
/// Bytes already handed to the file are flushed on every exit path, so a
/// later resume sees a consistent prefix.
pub(crate) async fn stream_to_file(
    ctx: &DownloadContext,
    url: &str,
    reader: &mut BoxReader,
    file: &mut File,
) -> Result<u64, DownloadError> {
    let mut buf = vec![0u8; COPY_BUFFER_SIZE];
    let mut written = 0u64;

    let outcome = loop {
        let read = tokio::select! {
            biased;
            reason = ctx.done() => break Err(DownloadError::from_context(reason, url)),
            read = reader.read(&mut buf) => read,
        };

        match read {
            Ok(0) => break Ok(written),
            Ok(n) => {
                if let Err(e) = file.write_all(&buf[..n]).await {
                    break Err(e.into());
                }
                written += n as u64;
            }
            Err(e) => break Err(into_download_error(e)),
        }
    };

    file.flush().await?;
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;
    use crate::{DownloaderConfig, create_client};

    fn client() -> Client {
        create_client(&DownloaderConfig::default()).unwrap()
    }

    fn transfer(size: i64) -> Arc<Transfer> {
        Arc::new(Transfer {
            // Nothing listens here; any request would fail
            url: "http://127.0.0.1:9/data.bin".to_string(),
            name: "data.bin".to_string(),
            size,
            options: Options::default(),
        })
    }

    #[tokio::test]
    async fn test_complete_staged_chunk_skips_network() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingDir::for_url(root.path(), "http://127.0.0.1:9/data.bin");
        staging.prepare().await.unwrap();
        std::fs::write(staging.chunk_path(1), b"0123456789").unwrap();

        let worker = ChunkWorker::new(client(), transfer(20), staging, true);
        let chunk = Chunk {
            index: 1,
            start: 10,
            end: 19,
        };

        let (tx, mut rx) = mpsc::channel(1);
        worker.run(DownloadContext::new(), chunk, tx).await;

        let message = rx.recv().await.unwrap();
        assert_eq!(message.index, 1);
        let mut contents = String::new();
        message
            .result
            .unwrap()
            .read_to_string(&mut contents)
            .await
            .unwrap();
        assert_eq!(contents, "0123456789");
    }

    #[tokio::test]
    async fn test_canceled_worker_reports_nothing() {
        let root = tempfile::tempdir().unwrap();
        let staging = StagingDir::for_url(root.path(), "http://127.0.0.1:9/data.bin");
        staging.prepare().await.unwrap();

        let worker = ChunkWorker::new(client(), transfer(20), staging.clone(), false);
        let chunk = Chunk {
            index: 0,
            start: 0,
            end: 19,
        };

        let ctx = DownloadContext::new();
        ctx.cancel();

        let (tx, mut rx) = mpsc::channel(1);
        worker.run(ctx, chunk, tx).await;

        assert!(rx.recv().await.is_none());
        // The staging file was created before the request was abandoned
        assert_eq!(std::fs::metadata(staging.chunk_path(0)).unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_stream_to_file_copies_everything() {
        let root = tempfile::tempdir().unwrap();
        let path = root.path().join("0");
        let mut file = create_staging_file(&path).await.unwrap();

        let data: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut reader: BoxReader = Box::new(std::io::Cursor::new(data.clone()));

        let written = stream_to_file(&DownloadContext::new(), "http://x/0", &mut reader, &mut file)
            .await
            .unwrap();
        assert_eq!(written, data.len() as u64);
        assert_eq!(std::fs::read(&path).unwrap(), data);
    }
}
