//! Notifications sent from the publisher to the host.

use serde::{Deserialize, Serialize};

/// State string for a successful connect (publish pending).
pub const STATUS_CONNECTING: &str = "CONNECTING";

/// State string once publishing has started.
pub const STATUS_CONNECTED: &str = "CONNECTED";

/// State string for a rejected connect.
pub const STATUS_FAILED: &str = "FAILED";

/// State string for a closed connection.
pub const STATUS_CLOSED: &str = "CLOSED";

/// State string for a transport fault.
pub const STATUS_IO_ERROR: &str = "I/O ERROR";

/// State string once the reconnect budget is spent.
pub const STATUS_RETRIES_EXHAUSTED: &str = "RETRIES EXHAUSTED";

/// Events that the publisher can send to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PublisherEvent {
    /// The server started accepting media.
    ConnectionStarted,

    /// The connection to the server succeeded.
    ConnectionSuccess,

    /// The connection to the server was rejected.
    ConnectionFailed,

    /// The connection was closed.
    Disconnect,

    /// Stream status string changed.
    StreamStateChanged(String),

    /// Bitrate estimate from the engine. Not produced by the session.
    NewBitrate(u32),

    /// Bounded reconnection gave up.
    RetriesExhausted {
        /// Reconnect attempts made before giving up.
        attempts: u32,
    },
}
