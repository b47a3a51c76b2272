//! Error types for the encoder module.

use thiserror::Error;

/// Errors that can occur while resolving encoder settings.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Settings cannot be applied to an encoder.
    #[error("Invalid encoder settings: {0}")]
    InvalidSettings(String),
}
