//! Error types for the DriftKV client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ClientError
pub type Result<T> = std::result::Result<T, ClientError>;

/// Unified error type for client operations
#[derive(Debug, Error)]
pub enum ClientError {
    // -------------------------------------------------------------------------
    // Argument Errors
    // -------------------------------------------------------------------------
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Request timed out")]
    TimedOut,

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol violation: {0}")]
    Protocol(String),

    // -------------------------------------------------------------------------
    // Server-Reported Errors
    // -------------------------------------------------------------------------
    #[error("Server error: {detail}")]
    Server { detail: String },
}
