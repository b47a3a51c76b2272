//! Error types for the transport module.

use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Invalid RTMP URL.
    #[error("Invalid RTMP URL: {0}")]
    InvalidUrl(String),

    /// Connection error (general).
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server rejected the connection.
    #[error("Connection rejected: {0}")]
    ConnectionRejected(String),

    /// The server did not answer in time.
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    /// RTMP protocol error.
    #[error("RTMP protocol error: {0}")]
    Protocol(String),

    /// A capture or audio device is not available.
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
