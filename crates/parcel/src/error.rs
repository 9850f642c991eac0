use crate::context::ContextError;

// Failure vocabulary for every public entry point of the engine
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response code, received '{got}' expected '{expected}'")]
    InvalidResponseCode { got: u16, expected: u16 },

    #[error("Invalid content length '{0}'")]
    InvalidContentLength(i64),

    #[error("Download canceled for '{url}'")]
    Canceled { url: String },

    #[error("Download timeout exceeded for '{url}'")]
    DeadlineExceeded { url: String },

    #[error("{op} {path}: bad file descriptor")]
    BadDescriptor { op: &'static str, path: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("Chunk worker failed: {0}")]
    Worker(String),
}

impl DownloadError {
    /// Build the terminal error for a transfer stopped by its context.
    pub fn from_context(reason: ContextError, url: impl Into<String>) -> Self {
        match reason {
            ContextError::Canceled => DownloadError::Canceled { url: url.into() },
            ContextError::DeadlineExceeded => DownloadError::DeadlineExceeded { url: url.into() },
        }
    }

    /// True for the two context-driven terminal errors.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            DownloadError::Canceled { .. } | DownloadError::DeadlineExceeded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_code_message() {
        let err = DownloadError::InvalidResponseCode {
            got: 404,
            expected: 200,
        };
        assert_eq!(
            err.to_string(),
            "Invalid response code, received '404' expected '200'"
        );

        let err = DownloadError::InvalidResponseCode {
            got: 404,
            expected: 206,
        };
        assert_eq!(
            err.to_string(),
            "Invalid response code, received '404' expected '206'"
        );
    }

    #[test]
    fn test_content_length_message() {
        assert_eq!(
            DownloadError::InvalidContentLength(-1).to_string(),
            "Invalid content length '-1'"
        );
    }

    #[test]
    fn test_context_errors_carry_url() {
        let url = "http://127.0.0.1:8080/testdata/data.txt";

        let err = DownloadError::from_context(ContextError::Canceled, url);
        assert!(matches!(err, DownloadError::Canceled { .. }));
        assert_eq!(
            err.to_string(),
            "Download canceled for 'http://127.0.0.1:8080/testdata/data.txt'"
        );
        assert!(err.is_interrupted());

        let err = DownloadError::from_context(ContextError::DeadlineExceeded, url);
        assert!(matches!(err, DownloadError::DeadlineExceeded { .. }));
        assert!(err.to_string().starts_with("Download timeout exceeded for"));
        assert!(err.to_string().ends_with("/testdata/data.txt'"));
    }

    #[test]
    fn test_bad_descriptor_message() {
        let err = DownloadError::BadDescriptor {
            op: "stat",
            path: "data.txt".to_string(),
        };
        assert_eq!(err.to_string(), "stat data.txt: bad file descriptor");
        assert!(!err.is_interrupted());
    }
}
