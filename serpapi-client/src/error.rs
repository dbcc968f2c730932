//! Error taxonomy for SerpApi calls.

use serpapi_http::TransportError;
use thiserror::Error;

/// Everything a client call can fail with. Nothing is retried internally.
#[derive(Debug, Error)]
pub enum SerpError {
    /// Base address + path did not form a valid absolute URL.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Non-200 response without a structured `error` field; raw body kept.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },

    /// Failure with no HTTP status at all (connect, TLS, body read).
    #[error("request failed: {0}")]
    Network(String),

    /// The API reported an error, via status code or in-band on a 200.
    #[error("{}", api_message(.status, .message))]
    Api {
        status: Option<u16>,
        message: String,
    },

    /// Body was not JSON of the expected shape.
    #[error("failed to decode JSON: {0}")]
    Decode(String),

    #[error("request cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

fn api_message(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("serpapi error ({code}): {message}"),
        None => format!("serpapi error: {message}"),
    }
}

impl SerpError {
    /// HTTP status attached to the failure, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::Api { status, .. } => *status,
            _ => None,
        }
    }

    /// Upstream message for [`SerpError::Api`].
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api { message, .. } => Some(message),
            _ => None,
        }
    }
}

impl From<TransportError> for SerpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Cancelled => Self::Cancelled,
            TransportError::Timeout => Self::DeadlineExceeded,
            TransportError::Build(msg) | TransportError::Network(msg) => Self::Network(msg),
        }
    }
}
