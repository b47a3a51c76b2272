//! Common types shared by the host, the session and the streaming engine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default natural video width.
pub const DEFAULT_WIDTH: u32 = 720;

/// Default natural video height.
pub const DEFAULT_HEIGHT: u32 = 1280;

/// Default video bitrate in bits per second.
pub const DEFAULT_VIDEO_BITRATE: u32 = 3000 * 1000;

/// Default audio bitrate in bits per second.
pub const DEFAULT_AUDIO_BITRATE: u32 = 192 * 1000;

/// Default maximum number of bounded reconnect attempts.
pub const DEFAULT_MAX_RETRIES: u32 = 10;

/// Errors produced when parsing host-supplied values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The string does not name a capture orientation.
    #[error("Unknown orientation: {0}")]
    UnknownOrientation(String),

    /// The index does not name an audio input type.
    #[error("Unknown audio input index: {0}")]
    UnknownAudioInput(i32),
}

/// Where the stream is published to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamTarget {
    /// RTMP application URL (e.g., "rtmp://live.example.com/app").
    pub url: String,

    /// Name the stream is published under.
    pub stream_name: String,
}

impl StreamTarget {
    /// Create a new stream target.
    pub fn new(url: impl Into<String>, stream_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            stream_name: stream_name.into(),
        }
    }

    /// Full publish address, `url/stream_name`.
    pub fn publish_url(&self) -> String {
        if self.url.ends_with('/') {
            format!("{}{}", self.url, self.stream_name)
        } else {
            format!("{}/{}", self.url, self.stream_name)
        }
    }

    /// Returns true if both the URL and the stream name are set.
    pub fn is_complete(&self) -> bool {
        !self.url.is_empty() && !self.stream_name.is_empty()
    }
}

/// Video settings in natural (unrotated) orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VideoSettings {
    /// Natural width in pixels.
    pub width: u32,

    /// Natural height in pixels.
    pub height: u32,

    /// Video bitrate in bits per second.
    pub bitrate: u32,

    /// Audio bitrate in bits per second.
    pub audio_bitrate: u32,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            bitrate: DEFAULT_VIDEO_BITRATE,
            audio_bitrate: DEFAULT_AUDIO_BITRATE,
        }
    }
}

/// Capture orientation applied to the video stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Orientation {
    #[default]
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
}

impl Orientation {
    /// All capture orientations.
    pub const ALL: [Orientation; 4] = [
        Orientation::Portrait,
        Orientation::LandscapeLeft,
        Orientation::LandscapeRight,
        Orientation::PortraitUpsideDown,
    ];

    /// Upside-down portrait counts as portrait.
    pub fn is_portrait(self) -> bool {
        matches!(self, Self::Portrait | Self::PortraitUpsideDown)
    }

    /// Returns true for either landscape orientation.
    pub fn is_landscape(self) -> bool {
        !self.is_portrait()
    }

    /// Host-facing name of the orientation.
    pub fn name(self) -> &'static str {
        match self {
            Self::Portrait => "portrait",
            Self::PortraitUpsideDown => "portraitUpsideDown",
            Self::LandscapeLeft => "landscapeLeft",
            Self::LandscapeRight => "landscapeRight",
        }
    }

    /// Parse a list of host-supplied names, dropping unrecognised entries.
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> Vec<Orientation> {
        names
            .iter()
            .filter_map(|name| name.as_ref().parse().ok())
            .collect()
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Orientation {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "portrait" => Ok(Self::Portrait),
            "portraitupsidedown" => Ok(Self::PortraitUpsideDown),
            "landscapeleft" => Ok(Self::LandscapeLeft),
            "landscaperight" => Ok(Self::LandscapeRight),
            _ => Err(ParseError::UnknownOrientation(s.to_string())),
        }
    }
}

/// Physical orientation reported by the device sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOrientation {
    Unknown,
    Portrait,
    PortraitUpsideDown,
    LandscapeLeft,
    LandscapeRight,
    FaceUp,
    FaceDown,
}

/// Which camera feeds the stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CameraPosition {
    Front,
    #[default]
    Back,
}

impl CameraPosition {
    /// The other camera.
    pub fn flipped(self) -> Self {
        match self {
            Self::Front => Self::Back,
            Self::Back => Self::Front,
        }
    }
}

/// Audio input the host asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AudioInputType {
    /// Bluetooth hands-free headset.
    Bluetooth,

    /// Built-in microphone.
    Speaker,

    /// Wired headset microphone.
    Headset,
}

impl TryFrom<i32> for AudioInputType {
    type Error = ParseError;

    fn try_from(index: i32) -> Result<Self, Self::Error> {
        match index {
            0 => Ok(Self::Bluetooth),
            1 => Ok(Self::Speaker),
            2 => Ok(Self::Headset),
            other => Err(ParseError::UnknownAudioInput(other)),
        }
    }
}

/// Hardware type of an audio input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioPortType {
    BluetoothHfp,
    BuiltInMic,
    HeadsetMic,
    Other(String),
}

/// A data source (individual microphone) on an input port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDataSource {
    /// Engine identifier for this source.
    pub id: String,

    /// Whether the microphone faces the front of the device.
    pub front_facing: bool,
}

/// An audio input port offered by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioPort {
    /// Engine identifier for this port.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Port hardware type.
    pub port_type: AudioPortType,

    /// Selectable data sources on this port.
    pub data_sources: Vec<AudioDataSource>,
}

/// A resolved audio input selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRoute {
    /// Port to prefer.
    pub port_id: String,

    /// Data source on that port, if one should be selected.
    pub data_source_id: Option<String>,
}

/// Bounded reconnect configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Reconnect attempts allowed after a failure or close.
    pub max_retries: u32,

    /// Delay unit in milliseconds; attempt `k` waits `base * 2^k`.
    pub base_delay_ms: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_ms: 1000,
        }
    }
}

/// Configuration supplied by the host before publishing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PublisherConfig {
    /// RTMP application URL.
    pub stream_url: String,

    /// Stream name.
    pub stream_name: String,

    /// Natural video settings.
    pub video_settings: VideoSettings,

    /// Allowed capture orientations, case-insensitive.
    pub allowed_orientations: Vec<String>,

    /// Initial camera.
    pub camera: CameraPosition,

    /// Initial audio input, if one should be selected at attach.
    pub audio_input: Option<AudioInputType>,

    /// Reconnect policy.
    pub reconnect: ReconnectConfig,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            stream_url: String::new(),
            stream_name: String::new(),
            video_settings: VideoSettings::default(),
            allowed_orientations: Orientation::ALL
                .iter()
                .map(|o| o.name().to_string())
                .collect(),
            camera: CameraPosition::default(),
            audio_input: None,
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl PublisherConfig {
    /// Stream target described by this configuration.
    pub fn target(&self) -> StreamTarget {
        StreamTarget::new(self.stream_url.clone(), self.stream_name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_url() {
        let target = StreamTarget::new("rtmp://host/app", "s1");
        assert_eq!(target.publish_url(), "rtmp://host/app/s1");

        let target = StreamTarget::new("rtmp://host/app/", "s1");
        assert_eq!(target.publish_url(), "rtmp://host/app/s1");

        assert!(!StreamTarget::default().is_complete());
    }

    #[test]
    fn test_orientation_parse_is_case_insensitive() {
        assert_eq!("LandscapeLeft".parse::<Orientation>(), Ok(Orientation::LandscapeLeft));
        assert_eq!(
            "PORTRAITUPSIDEDOWN".parse::<Orientation>(),
            Ok(Orientation::PortraitUpsideDown)
        );
        assert!("sideways".parse::<Orientation>().is_err());

        let parsed = Orientation::parse_list(&["portrait", "bogus", "landscapeRight"]);
        assert_eq!(parsed, vec![Orientation::Portrait, Orientation::LandscapeRight]);
    }

    #[test]
    fn test_audio_input_index() {
        assert_eq!(AudioInputType::try_from(0), Ok(AudioInputType::Bluetooth));
        assert_eq!(AudioInputType::try_from(2), Ok(AudioInputType::Headset));
        assert_eq!(
            AudioInputType::try_from(3),
            Err(ParseError::UnknownAudioInput(3))
        );
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: PublisherConfig = serde_json::from_str(
            r#"{ "streamUrl": "rtmp://host/app", "videoSettings": { "bitrate": 1000 } }"#,
        )
        .unwrap();

        assert_eq!(config.stream_url, "rtmp://host/app");
        assert_eq!(config.video_settings.width, DEFAULT_WIDTH);
        assert_eq!(config.video_settings.bitrate, 1000);
        assert_eq!(config.allowed_orientations.len(), 4);
        assert_eq!(config.reconnect.max_retries, DEFAULT_MAX_RETRIES);
    }
}
