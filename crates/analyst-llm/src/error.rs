//! Error types for LLM operations

use thiserror::Error;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Errors that can occur while streaming a completion
#[derive(Error, Debug)]
pub enum LLMError {
    /// Vendor answered with a non-success status
    #[error("{provider} API error (status {status}): {body}")]
    Api {
        /// Provider name (e.g. "glm")
        provider: String,
        /// HTTP status code
        status: u16,
        /// Response body, kept verbatim for diagnostics
        body: String,
    },

    /// Connection, send, or body read failure
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Response body stream broke off mid-read
    #[error("Failed to read response stream: {0}")]
    StreamRead(String),

    /// The whole-request timeout fired while the body was still streaming
    #[error("Response stream timed out: {0}")]
    Timeout(String),

    /// Vendor reported an error inside an otherwise healthy stream
    #[error("{provider} stream error: {message}")]
    StreamError {
        /// Provider name
        provider: String,
        /// Vendor error message
        message: String,
    },

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// The fragment consumer went away
    #[error("Fragment sink closed: {0}")]
    SinkClosed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LLMError {
    /// Vendor HTTP status, when the failure came from a non-success response
    pub fn status(&self) -> Option<u16> {
        match self {
            LLMError::Api { status, .. } => Some(*status),
            LLMError::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Whether the vendor call ran out of time
    pub fn is_timeout(&self) -> bool {
        match self {
            LLMError::Timeout(_) => true,
            LLMError::HttpError(e) => e.is_timeout(),
            _ => false,
        }
    }
}
