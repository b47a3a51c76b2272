//! Commands sent from the host to the publisher.

use serde::{Deserialize, Serialize};

use crate::types::{AudioInputType, DeviceOrientation, VideoSettings};

/// Commands that the host can send to the publisher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PublisherCommand {
    /// Set the RTMP application URL.
    SetStreamUrl(String),

    /// Set the stream name.
    SetStreamName(String),

    /// Replace the natural video settings.
    SetVideoSettings(VideoSettings),

    /// Replace the orientation allow-list (case-insensitive names).
    SetAllowedOrientations(Vec<String>),

    /// Connect and publish.
    StartPublish,

    /// Close the stream and the connection.
    StopPublish,

    /// The device sensor reported a new physical orientation.
    DeviceOrientationChanged(DeviceOrientation),

    /// Route audio from the given input type.
    SetAudioInput(AudioInputType),

    /// Mute or unmute audio.
    SetAudioMuted(bool),

    /// Switch between front and back camera.
    SwitchCamera,

    /// Toggle the camera torch.
    ToggleTorch,

    /// Detach the session and stop the publisher.
    Shutdown,
}
