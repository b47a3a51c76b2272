//! Typed host<->publisher messages for the RTMP publisher.
//!
//! This crate defines the data model shared by the session, the streaming
//! engine and the embedding host, plus the command and event channels
//! between them.

mod commands;
mod events;
mod state;
mod types;

pub use commands::PublisherCommand;
pub use events::{
    PublisherEvent, STATUS_CLOSED, STATUS_CONNECTED, STATUS_CONNECTING, STATUS_FAILED,
    STATUS_IO_ERROR, STATUS_RETRIES_EXHAUSTED,
};
pub use state::{SessionSnapshot, SessionState};
pub use types::{
    AudioDataSource, AudioInputType, AudioPort, AudioPortType, AudioRoute, CameraPosition,
    DeviceOrientation, Orientation, ParseError, PublisherConfig, ReconnectConfig, StreamTarget,
    VideoSettings, DEFAULT_AUDIO_BITRATE, DEFAULT_HEIGHT, DEFAULT_MAX_RETRIES,
    DEFAULT_VIDEO_BITRATE, DEFAULT_WIDTH,
};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for commands (host → publisher).
pub const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Channel capacity for events (publisher → host).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Creates a bounded command channel.
pub fn command_channel() -> (Sender<PublisherCommand>, Receiver<PublisherCommand>) {
    crossbeam_channel::bounded(COMMAND_CHANNEL_CAPACITY)
}

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<PublisherEvent>, Receiver<PublisherEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
