//! Error types for the publisher.

use thiserror::Error;

use publisher_audio::AudioError;
use publisher_encoder::EncoderError;
use publisher_transport::TransportError;

/// Errors that can occur while driving the publish session.
#[derive(Debug, Error)]
pub enum PublisherError {
    /// The host configuration cannot produce a working stream.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Encoder settings rejected.
    #[error(transparent)]
    Encoder(#[from] EncoderError),

    /// Audio input could not be routed.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// Engine operation failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The publisher is not keeping up with host commands.
    #[error("Publisher command channel full")]
    ChannelFull,

    /// The publisher thread is gone.
    #[error("Publisher channel disconnected")]
    ChannelDisconnected,

    /// The publisher thread could not be started.
    #[error("Failed to spawn publisher thread: {0}")]
    Spawn(#[from] std::io::Error),
}
