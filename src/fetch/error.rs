use thiserror::Error;

/// Outbound request failures, classified for the retry loop.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Request to {url} failed: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Unexpected payload from {url}: {reason}")]
    Payload { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    Client(reqwest::Error),

    #[error("Request limiter closed")]
    LimiterClosed,
}

impl FetchError {
    /// Whether another attempt may succeed.
    ///
    /// Data Dragon answers 429 and 5xx under load; everything else in the
    /// status range is treated as permanent (a 404 splash stays missing).
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            FetchError::Http { .. } => true,
            FetchError::Decode { .. }
            | FetchError::Payload { .. }
            | FetchError::Client(_)
            | FetchError::LimiterClosed => false,
        }
    }
}
