//! Transport layer errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Handshake failed: {0}")]
    Handshake(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("Session not open")]
    NotOpen,
}
