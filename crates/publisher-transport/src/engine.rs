//! The streaming engine seam.

use crossbeam_channel::Receiver;

use publisher_encoder::EncoderSettings;
use publisher_ipc::{AudioPort, AudioRoute, CameraPosition, Orientation};

use crate::connection::EngineStatus;
use crate::TransportResult;

/// Capture, encode and RTMP transport, as seen by the publish session.
///
/// Connection control never fails synchronously: problems surface later as
/// [`EngineStatus`] events on the subscribed channel.
pub trait StreamingEngine: Send {
    /// Start delivering status events. Replaces any earlier subscription.
    fn subscribe(&mut self) -> Receiver<EngineStatus>;

    /// Stop delivering status events.
    fn unsubscribe(&mut self);

    /// Connect to an RTMP application URL.
    fn connect(&mut self, url: &str);

    /// Publish under `stream_name` on the current connection.
    fn publish(&mut self, stream_name: &str);

    /// Close the publish stream and the connection.
    fn close(&mut self);

    /// Replace the encoder configuration in one step.
    fn apply_encoder_settings(&mut self, settings: &EncoderSettings);

    /// Set the capture orientation.
    fn set_video_orientation(&mut self, orientation: Orientation);

    /// Attach the camera and microphone.
    fn attach_devices(&mut self, camera: CameraPosition) -> TransportResult<()>;

    /// Detach all capture devices.
    fn detach_devices(&mut self);

    /// Currently available audio input ports.
    fn audio_inputs(&self) -> Vec<AudioPort>;

    /// Prefer the given audio input.
    fn set_audio_route(&mut self, route: &AudioRoute) -> TransportResult<()>;

    /// Mute or unmute audio.
    fn set_audio_muted(&mut self, muted: bool);

    /// Turn the camera torch on or off.
    fn set_torch(&mut self, on: bool);

    /// Keep the device awake while capturing.
    fn set_idle_timer_disabled(&mut self, _disabled: bool) {}

    /// Whether outbound media is backing up on the network.
    fn has_congestion(&self) -> bool;

    /// Whether audio capture and encoding are ready to publish.
    fn is_audio_prepared(&self) -> bool;

    /// Whether video capture and encoding are ready to publish.
    fn is_video_prepared(&self) -> bool;

    /// Whether the camera preview is running.
    fn is_on_preview(&self) -> bool;

    /// Get engine name for diagnostics.
    fn name(&self) -> &'static str;
}
