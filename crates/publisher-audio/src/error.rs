//! Error types for the audio module.

use thiserror::Error;

use publisher_ipc::AudioInputType;

/// Errors that can occur during audio input routing.
#[derive(Debug, Error)]
pub enum AudioError {
    /// No available port serves the requested input.
    #[error("No audio input available for {0:?}")]
    NoMatchingInput(AudioInputType),
}
