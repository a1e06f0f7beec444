//! Errors for the completion request.

use thiserror::Error;

/// Errors that can occur while talking to the completion endpoint.
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not configured for a remote endpoint.
    #[error("API key not configured for {endpoint}")]
    ApiKeyNotConfigured {
        /// Endpoint URL that required the key.
        endpoint: String,
    },

    /// The API key cannot be sent as a header value.
    #[error("invalid API key: {0}")]
    InvalidApiKey(String),

    /// The endpoint answered with a non-success status.
    #[error("upstream returned HTTP {status}: {body}")]
    Upstream {
        /// HTTP status code.
        status: u16,
        /// Response body, verbatim.
        body: String,
    },

    /// Connection, timeout, or mid-stream read failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// A single stream event could not be decoded.
    #[error("could not decode stream event: {0}")]
    Decode(String),
}

impl LlmError {
    /// Whether this error is local to one stream event and the stream may
    /// continue past it.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Transport(format!("request timed out: {e}"))
        } else {
            Self::Transport(e.to_string())
        }
    }
}

/// Result type for completion operations.
pub type LlmResult<T> = Result<T, LlmError>;
