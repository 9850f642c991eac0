//! # Parcel
//!
//! A client-side download engine that retrieves a remote file and exposes it
//! as a single sequential byte stream.
//!
//! ## Features
//!
//! - Parallel byte-range transfers when the server advertises `Accept-Ranges: bytes`
//! - Resumable on-disk staging keyed by URL
//! - Cancellation and deadlines through [`DownloadContext`]
//! - Stream observation hooks for progress reporting
//!
//! ```no_run
//! # async fn run() -> Result<(), parcel_engine::DownloadError> {
//! use tokio::io::AsyncReadExt;
//!
//! let options = parcel_engine::Options::new().with_concurrency(|_| 4);
//! let mut file = parcel_engine::open("https://example.com/archive.zip", options).await?;
//!
//! let mut data = Vec::new();
//! file.read_to_end(&mut data).await?;
//! println!("{} bytes", file.stat()?.len());
//! file.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod bytes_stream;
pub mod client;
pub mod config;
pub mod context;
pub mod downloader;
pub mod error;
pub mod file;
pub mod planner;
pub mod prober;
pub mod proxy;
pub mod staging;
mod worker;

pub use builder::DownloaderConfigBuilder;
pub use client::create_client;
pub use config::{BoxReader, ConcurrencyFn, DEFAULT_CONCURRENCY, DownloaderConfig, Options, ProxyFn};
pub use context::{ContextError, DownloadContext};
pub use downloader::Downloader;
pub use error::DownloadError;
pub use file::{FileInfo, RemoteFile};
pub use planner::{Chunk, plan_chunks};
pub use prober::Capabilities;
pub use proxy::{ProxyConfig, ProxyType};

/// Download `url` with a default [`Downloader`].
pub async fn open(url: &str, options: Options) -> Result<RemoteFile, DownloadError> {
    Downloader::new()?.open(url, options).await
}

/// Download `url` with a default [`Downloader`], stopping when `ctx` does.
pub async fn open_with_context(
    ctx: DownloadContext,
    url: &str,
    options: Options,
) -> Result<RemoteFile, DownloadError> {
    Downloader::new()?.open_with_context(ctx, url, options).await
}
