//! Audio input routing for the publisher.
//!
//! Chooses which of the engine's audio input ports feeds the stream.

mod device;
mod error;

pub use device::{port_type_for, select_route};
pub use error::AudioError;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
