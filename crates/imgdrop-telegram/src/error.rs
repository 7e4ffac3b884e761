/// Failures talking to the Bot API.
///
/// Every variant is recoverable from the caller's point of view; none of them
/// should stop the polling loop.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Connection, timeout or body read failure. The URL (which embeds the
    /// token) is stripped before this is constructed.
    #[error("HTTP request failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("Unexpected HTTP status {status}")]
    Status { status: u16 },

    #[error("Bot API error {code:?}: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// Another consumer holds the long poll, or a webhook is set.
    #[error("Conflict: another consumer is receiving updates for this bot")]
    Conflict,

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("File {0} has no download path")]
    MissingFilePath(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        TransportError::Http(err.without_url())
    }
}
