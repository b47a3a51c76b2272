//! Session state machine types.

use serde::{Deserialize, Serialize};

use crate::types::Orientation;

/// Connection lifecycle state of the publish session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// Not publishing.
    #[default]
    Idle,

    /// Connection requested, waiting for the server.
    Connecting,

    /// Connected, publish requested.
    Connected,

    /// Media is flowing to the server.
    Publishing,

    /// The last connect attempt was rejected.
    Failed,

    /// The connection was closed.
    Closed,
}

impl SessionState {
    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Publishing => "Publishing",
            Self::Failed => "Failed",
            Self::Closed => "Closed",
        }
    }
}

/// Read-only view of the session for host queries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current state.
    pub state: SessionState,

    /// Whether the host asked to publish.
    pub is_streaming: bool,

    /// Bounded reconnect attempts made since the last successful connect.
    pub retry_count: u32,

    /// Full publish address.
    pub publish_url: String,

    /// Active capture orientation.
    pub orientation: Orientation,

    /// Whether audio is muted.
    pub muted: bool,

    /// Whether outbound media is backing up on the network.
    pub congested: bool,

    /// Whether audio capture and encoding are ready.
    pub audio_prepared: bool,

    /// Whether video capture and encoding are ready.
    pub video_prepared: bool,

    /// Whether the camera preview is running.
    pub camera_on_preview: bool,
}
