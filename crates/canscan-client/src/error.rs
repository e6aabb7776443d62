//! Error types for scan client operations

use thiserror::Error;

/// Result type alias for scan client operations
pub type Result<T> = std::result::Result<T, ScanClientError>;

/// Errors that can occur during REST calls against the scan backend
#[derive(Error, Debug)]
pub enum ScanClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Server returned an error response
    #[error("Server error {status}: {message}")]
    ServerError { status: u16, message: String },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Timeout
    #[error("Request timed out")]
    Timeout,
}

impl ScanClientError {
    /// Create a server error from status code and message
    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::ServerError {
            status,
            message: message.into(),
        }
    }
}

impl From<ScanClientError> for canscan_core::ReportError {
    fn from(err: ScanClientError) -> Self {
        use canscan_core::ReportError;

        match err {
            ScanClientError::ServerError { status, message } => {
                ReportError::Server { status, message }
            }
            ScanClientError::ParseError(msg) => ReportError::Malformed(msg),
            other => ReportError::Unreachable(other.to_string()),
        }
    }
}

/// Errors returned by [`ScanController`](crate::ScanController)
#[derive(Error, Debug)]
pub enum ControllerError {
    /// A scan is already connecting or streaming
    #[error("A scan is already in progress (session {0})")]
    ScanInProgress(uuid::Uuid),

    /// The driver task panicked or was aborted
    #[error("Scan driver stopped unexpectedly: {0}")]
    DriverFailed(String),
}
