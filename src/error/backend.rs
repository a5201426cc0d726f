//! Transport and protocol errors raised while talking to a backend.

use thiserror::Error;

use super::ERROR_MESSAGE_PREFIX;

/// Errors from the HTTP port.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// Could not connect to the server
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request or body read timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server answered with a non-2xx status
    #[error("Server returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Body could not be read mid-transfer
    #[error("IO error: {0}")]
    Io(String),

    /// Anything else the client library reported
    #[error("HTTP error: {0}")]
    Other(String),
}

impl HttpError {
    /// Whether the failure happened before the server produced a response.
    pub fn is_connect(&self) -> bool {
        matches!(self, HttpError::ConnectionFailed(_) | HttpError::Timeout(_))
    }
}

/// Errors a backend driver can report for one user action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// Network failure or non-success status
    #[error(transparent)]
    Transport(#[from] HttpError),

    /// The response body did not have the expected shape
    #[error("{0}")]
    Protocol(String),

    /// Request body could not be encoded
    #[error("Failed to encode request: {0}")]
    Encode(String),
}

impl BackendError {
    /// Text of the assistant message that reports this error in a conversation.
    pub fn bubble_text(&self) -> String {
        format!("{}{}", ERROR_MESSAGE_PREFIX, self)
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Encode(e.to_string())
    }
}
