//! Streaming engine abstraction and RTMP client adapter.
//!
//! This crate defines the [`StreamingEngine`] seam the publish session
//! drives, the status events engines raise, the reconnection policy, and an
//! engine implementation on top of `rml_rtmp`.

mod connection;
mod engine;
mod error;
mod rtmp;

pub use connection::{
    EngineStatus, ReconnectPolicy, CODE_CONNECT_CLOSED, CODE_CONNECT_FAILED,
    CODE_CONNECT_SUCCESS, CODE_PUBLISH_START,
};
pub use engine::StreamingEngine;
pub use error::TransportError;
pub use rtmp::RtmpEngine;

/// Channel capacity for engine status events.
pub const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Maximum bounded reconnection attempts.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Base reconnect delay in milliseconds.
pub const BASE_RECONNECT_DELAY_MS: u64 = 1000;

/// Default RTMP port.
pub const DEFAULT_RTMP_PORT: u16 = 1935;
