use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, HeaderMap};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use crate::DownloadError;
use crate::context::DownloadContext;

/// What a metadata probe learned about a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Declared size in bytes, -1 when the server did not declare one
    pub content_length: i64,
    /// Whether the server advertises `Accept-Ranges: bytes`
    pub accept_ranges: bool,
}

impl Capabilities {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let content_length = headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
            .unwrap_or(-1);

        let accept_ranges = headers
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("bytes"));

        Self {
            content_length,
            accept_ranges,
        }
    }
}

/// Parse a caller-supplied URL, rejecting empty input.
pub(crate) fn parse_url(url: &str) -> Result<Url, DownloadError> {
    if url.trim().is_empty() {
        return Err(DownloadError::InvalidRequest("empty URL".to_string()));
    }
    Url::parse(url).map_err(|e| DownloadError::InvalidRequest(format!("{url}: {e}")))
}

/// Issue a HEAD request for `url` and report its size and range support.
#[instrument(skip(client, ctx), level = "debug")]
pub async fn probe(
    client: &Client,
    ctx: &DownloadContext,
    url: &str,
) -> Result<Capabilities, DownloadError> {
    let parsed = parse_url(url)?;

    let response = tokio::select! {
        biased;
        reason = ctx.done() => return Err(DownloadError::from_context(reason, url)),
        response = client.head(parsed).send() => response?,
    };

    if response.status() != StatusCode::OK {
        return Err(DownloadError::InvalidResponseCode {
            got: response.status().as_u16(),
            expected: StatusCode::OK.as_u16(),
        });
    }

    let capabilities = Capabilities::from_headers(response.headers());
    debug!(
        content_length = capabilities.content_length,
        accept_ranges = capabilities.accept_ranges,
        "Probe complete"
    );
    Ok(capabilities)
}
