use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Parallel resumable HTTP downloader",
    long_about = "Downloads a file over HTTP, splitting the transfer into parallel byte-range\n\
                  requests when the server supports them. Interrupted downloads leave their\n\
                  chunks in a staging directory and pick up where they stopped on the next run."
)]
pub struct CliArgs {
    /// URL to download
    #[arg(required = true, help = "URL of the file to download")]
    pub url: String,

    /// Output file
    #[arg(
        short,
        long,
        help = "Where to write the file (default: last path segment of the URL)"
    )]
    pub output: Option<PathBuf>,

    /// Number of parallel range requests
    #[arg(
        short,
        long,
        help = "Number of parallel range requests (default: 10, 0 also selects the default)"
    )]
    pub concurrency: Option<usize>,

    /// Overall transfer deadline in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Abort the whole transfer after this many seconds. Use 0 for no limit."
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "10",
        help = "Timeout for establishing each connection, in seconds"
    )]
    pub connect_timeout: u64,

    /// Show progress bars
    #[arg(short = 'P', long = "progress", help = "Show a progress bar per chunk")]
    pub show_progress: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Proxy URL
    #[arg(long, help = "Proxy server URL, e.g. http://proxy.example.com:8080")]
    pub proxy: Option<String>,

    /// Proxy type
    #[arg(
        long,
        default_value = "http",
        help = "Proxy type: http, https, socks5 or all"
    )]
    pub proxy_type: String,

    /// Disable every proxy, including system settings
    #[arg(long, help = "Disable all proxies, including system proxy settings")]
    pub no_proxy: bool,

    /// Extra request headers
    #[arg(
        short = 'H',
        long = "header",
        help = "Extra request header in 'Name: Value' form, may be repeated"
    )]
    pub headers: Vec<String>,

    /// Staging root
    #[arg(
        long,
        help = "Directory holding partial downloads (default: the system temp directory)"
    )]
    pub staging_dir: Option<PathBuf>,
}
