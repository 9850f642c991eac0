use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tokio::io::AsyncRead;

use crate::proxy::ProxyConfig;

const DEFAULT_USER_AGENT: &str = concat!("parcel/", env!("CARGO_PKG_VERSION"));

/// Worker count used when no concurrency policy is set, or when it returns 0
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Type-erased byte stream handed to and returned from the [`ProxyFn`] hook
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Maps the total size of a resource to the number of concurrent chunk
/// workers. A result of 0 falls back to [`DEFAULT_CONCURRENCY`].
pub type ConcurrencyFn = Arc<dyn Fn(i64) -> usize + Send + Sync>;

/// Wraps a download stream, e.g. to observe progress.
///
/// Called with a label (`"<name>-<index>"` per chunk, `"<name>"` for a
/// whole-file fetch), the number of bytes the stream will deliver (0 when
/// unknown) and the raw stream. The returned stream must yield the same bytes.
pub type ProxyFn = Arc<dyn Fn(&str, u64, BoxReader) -> BoxReader + Send + Sync>;

/// Per-transfer hooks
#[derive(Clone, Default)]
pub struct Options {
    pub concurrency: Option<ConcurrencyFn>,
    pub proxy: Option<ProxyFn>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency<F>(mut self, f: F) -> Self
    where
        F: Fn(i64) -> usize + Send + Sync + 'static,
    {
        self.concurrency = Some(Arc::new(f));
        self
    }

    pub fn with_proxy<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, u64, BoxReader) -> BoxReader + Send + Sync + 'static,
    {
        self.proxy = Some(Arc::new(f));
        self
    }

    /// Number of chunk workers for a resource of `size` bytes.
    pub fn worker_count(&self, size: i64) -> usize {
        match &self.concurrency {
            Some(f) => match f(size) {
                0 => DEFAULT_CONCURRENCY,
                n => n,
            },
            None => DEFAULT_CONCURRENCY,
        }
    }

    /// Pass `reader` through the proxy hook, if any.
    pub(crate) fn wrap(&self, label: &str, size: u64, reader: BoxReader) -> BoxReader {
        match &self.proxy {
            Some(f) => f(label, size, reader),
            None => reader,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("concurrency", &self.concurrency.is_some())
            .field("proxy", &self.proxy.is_some())
            .finish()
    }
}

/// Configurable options for the downloader
#[derive(Debug, Clone)]
pub struct DownloaderConfig {
    /// Overall timeout for each HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// Custom HTTP headers for requests
    pub headers: HeaderMap,

    /// Network proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    /// Root directory under which staging directories are created
    pub staging_root: PathBuf,
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(10),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: DownloaderConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
            staging_root: std::env::temp_dir(),
        }
    }
}

impl DownloaderConfig {
    pub fn builder() -> crate::builder::DownloaderConfigBuilder {
        crate::builder::DownloaderConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        // Byte ranges must address the unencoded representation
        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("identity"),
        );

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers
    }
}
