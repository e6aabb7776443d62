//! Error types shared across scan collaborators

use thiserror::Error;

/// Result type for report fetches
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors a [`ReportService`](crate::ReportService) can return
#[derive(Debug, Error)]
pub enum ReportError {
    /// The backend could not be reached
    #[error("Report backend unreachable: {0}")]
    Unreachable(String),

    /// The backend answered with a non-success status
    #[error("Report backend error {status}: {message}")]
    Server { status: u16, message: String },

    /// The response body was not a report document
    #[error("Malformed report response: {0}")]
    Malformed(String),
}
