//! # Downloader
//!
//! Entry point of the engine. A transfer starts with a metadata probe; when the
//! server supports byte ranges the resource is split into chunks fetched in
//! parallel into a per-URL staging directory, otherwise it is fetched whole.
//! Either way the caller gets back a [`RemoteFile`] or an error, never a
//! partially assembled handle.

use std::sync::Arc;

use reqwest::{Client, StatusCode};
use tokio::fs::{self, File};
use tokio::io::AsyncSeekExt;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::bytes_stream::BytesStreamReader;
use crate::client::create_client;
use crate::config::{BoxReader, DownloaderConfig, Options};
use crate::context::DownloadContext;
use crate::file::{RemoteFile, file_name_from_url};
use crate::planner::plan_chunks;
use crate::prober::probe;
use crate::staging::{StagingDir, remove_staging};
use crate::worker::{ChunkResult, ChunkWorker, create_staging_file, stream_to_file};
use crate::DownloadError;

/// Immutable description of one transfer, shared by its chunk workers
#[derive(Debug)]
pub(crate) struct Transfer {
    pub url: String,
    pub name: String,
    pub size: i64,
    pub options: Options,
}

/// Parallel ranged HTTP downloader
#[derive(Debug, Clone)]
pub struct Downloader {
    client: Client,
    config: DownloaderConfig,
}

impl Downloader {
    /// Create a new Downloader with default configuration
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_config(DownloaderConfig::default())
    }

    /// Create a new Downloader with custom configuration
    pub fn with_config(config: DownloaderConfig) -> Result<Self, DownloadError> {
        let client = create_client(&config)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Download `url` under a context that is never canceled.
    pub async fn open(&self, url: &str, options: Options) -> Result<RemoteFile, DownloadError> {
        self.open_with_context(DownloadContext::new(), url, options)
            .await
    }

    /// Download `url`, stopping early when `ctx` is canceled or its deadline
    /// elapses.
    #[instrument(skip(self, ctx, options), level = "debug")]
    pub async fn open_with_context(
        &self,
        ctx: DownloadContext,
        url: &str,
        options: Options,
    ) -> Result<RemoteFile, DownloadError> {
        let capabilities = probe(&self.client, &ctx, url).await?;

        let transfer = Transfer {
            url: url.to_string(),
            name: file_name_from_url(url),
            size: capabilities.content_length,
            options,
        };

        if capabilities.accept_ranges {
            self.fetch_ranges(&ctx, Arc::new(transfer)).await
        } else {
            info!(url, "Server does not accept ranges, fetching whole file");
            self.fetch_whole(&ctx, &transfer).await
        }
    }

    async fn fetch_ranges(
        &self,
        ctx: &DownloadContext,
        transfer: Arc<Transfer>,
    ) -> Result<RemoteFile, DownloadError> {
        let url = transfer.url.as_str();
        let workers = transfer.options.worker_count(transfer.size);
        let chunks = plan_chunks(transfer.size, workers)?;

        let staging = StagingDir::for_url(&self.config.staging_root, url);
        let resume = staging.prepare().await?;

        info!(
            url,
            size = transfer.size,
            workers = chunks.len(),
            resume,
            "Starting ranged download"
        );

        let worker_ctx = ctx.child();
        let (tx, mut rx) = mpsc::channel::<ChunkResult>(chunks.len());
        let mut tasks = JoinSet::new();

        for chunk in chunks.iter().copied() {
            let worker = ChunkWorker::new(
                self.client.clone(),
                Arc::clone(&transfer),
                staging.clone(),
                resume,
            );
            tasks.spawn(worker.run(worker_ctx.clone(), chunk, tx.clone()));
        }
        // Workers hold the only senders now
        drop(tx);

        let mut slots: Vec<Option<File>> = chunks.iter().map(|_| None).collect();
        let mut pending = chunks.len();

        let outcome = loop {
            if pending == 0 {
                break Ok(());
            }

            tokio::select! {
                biased;
                reason = ctx.done() => {
                    info!(url, ?reason, "Download interrupted");
                    break Err(DownloadError::from_context(reason, url));
                }
                message = rx.recv() => match message {
                    Some(ChunkResult { index, result: Ok(file) }) => {
                        slots[index] = Some(file);
                        pending -= 1;
                    }
                    Some(ChunkResult { index, result: Err(e) }) => {
                        warn!(url, index, error = %e, "Chunk failed, aborting download");
                        break Err(e);
                    }
                    None => {
                        // Workers stay silent once the context has stopped
                        if let Some(reason) = ctx.err() {
                            info!(url, ?reason, "Download interrupted");
                            break Err(DownloadError::from_context(reason, url));
                        }
                        break Err(DownloadError::Worker(format!(
                            "{pending} chunk(s) of '{url}' were never reported"
                        )));
                    }
                },
            }
        };

        // Stop stragglers and wait for every worker before handing anything back
        worker_ctx.cancel();
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(url, error = %e, "Chunk worker terminated abnormally");
            }
        }

        outcome?;

        let readers = slots
            .into_iter()
            .collect::<Option<Vec<File>>>()
            .ok_or_else(|| DownloadError::Worker(format!("missing chunk file for '{url}'")))?;

        info!(url, size = transfer.size, "Ranged download complete");
        Ok(RemoteFile::new(
            url,
            transfer.size as u64,
            staging.path().to_path_buf(),
            readers,
        ))
    }

    async fn fetch_whole(
        &self,
        ctx: &DownloadContext,
        transfer: &Transfer,
    ) -> Result<RemoteFile, DownloadError> {
        let url = transfer.url.as_str();

        let response = tokio::select! {
            biased;
            reason = ctx.done() => return Err(DownloadError::from_context(reason, url)),
            response = self.client.get(url).send() => response?,
        };

        if response.status() != StatusCode::OK {
            return Err(DownloadError::InvalidResponseCode {
                got: response.status().as_u16(),
                expected: StatusCode::OK.as_u16(),
            });
        }

        fs::create_dir_all(&self.config.staging_root).await?;
        let staging = StagingDir::create_unique(&self.config.staging_root)?;
        debug!(url, dir = %staging.path().display(), "Staging whole-file download");

        let body: BoxReader = Box::new(BytesStreamReader::new(response.bytes_stream()));
        let mut reader = transfer
            .options
            .wrap(&transfer.name, transfer.size.max(0) as u64, body);

        let staged = async {
            let mut file = create_staging_file(&staging.chunk_path(0)).await?;
            let written = stream_to_file(ctx, url, &mut reader, &mut file).await?;
            file.seek(std::io::SeekFrom::Start(0)).await?;
            Ok::<_, DownloadError>((file, written))
        }
        .await;

        match staged {
            Ok((file, written)) => {
                info!(url, size = written, "Whole-file download complete");
                Ok(RemoteFile::new(
                    url,
                    written,
                    staging.path().to_path_buf(),
                    vec![file],
                ))
            }
            Err(e) => {
                if let Err(cleanup) = remove_staging(staging.path()).await {
                    warn!(dir = %staging.path().display(), error = %cleanup, "Failed to remove staging directory");
                }
                Err(e)
            }
        }
    }
}
