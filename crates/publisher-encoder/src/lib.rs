//! Orientation-aware encoder settings.
//!
//! Video settings are stored by the host in natural orientation; this crate
//! derives the configuration actually pushed to the engine's encoder for the
//! active capture orientation.

mod error;

pub use error::EncoderError;

use serde::{Deserialize, Serialize};

use publisher_ipc::{Orientation, VideoSettings};

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// Keyframe interval used for live publishing.
pub const KEYFRAME_INTERVAL_SECS: u32 = 2;

/// H.264 profile used for publishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum H264Profile {
    /// High profile, level chosen by the encoder.
    HighAutoLevel,
}

/// How the capture frame is fitted to the encoded size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalingMode {
    /// Crop the source to its clean aperture, then scale.
    CropSourceToCleanAperture,
}

/// Encoder configuration applied as one atomic update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderSettings {
    /// Encoded width in pixels.
    pub width: u32,

    /// Encoded height in pixels.
    pub height: u32,

    /// Video bitrate in bits per second.
    pub bitrate: u32,

    /// H.264 profile.
    pub profile: H264Profile,

    /// Maximum keyframe interval in seconds.
    pub keyframe_interval_secs: u32,

    /// Frame scaling.
    pub scaling_mode: ScalingMode,

    /// Audio bitrate in bits per second.
    pub audio_bitrate: u32,
}

impl EncoderSettings {
    /// Resolve the settings for the given orientation.
    ///
    /// Landscape orientations swap the natural width and height; both
    /// portrait orientations keep them. Bitrates pass through unchanged.
    pub fn resolve(video: &VideoSettings, orientation: Orientation) -> EncoderResult<Self> {
        if video.width == 0 || video.height == 0 {
            return Err(EncoderError::InvalidSettings(format!(
                "dimensions must be non-zero, got {}x{}",
                video.width, video.height
            )));
        }
        if video.bitrate == 0 {
            return Err(EncoderError::InvalidSettings(
                "video bitrate must be non-zero".into(),
            ));
        }

        let (width, height) = if orientation.is_landscape() {
            (video.height, video.width)
        } else {
            (video.width, video.height)
        };

        Ok(Self {
            width,
            height,
            bitrate: video.bitrate,
            profile: H264Profile::HighAutoLevel,
            keyframe_interval_secs: KEYFRAME_INTERVAL_SECS,
            scaling_mode: ScalingMode::CropSourceToCleanAperture,
            audio_bitrate: video.audio_bitrate,
        })
    }

    /// Encoded size as (width, height).
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> VideoSettings {
        VideoSettings {
            width: 720,
            height: 1280,
            bitrate: 3_000_000,
            audio_bitrate: 128_000,
        }
    }

    #[test]
    fn test_portrait_keeps_natural_dimensions() {
        for orientation in [Orientation::Portrait, Orientation::PortraitUpsideDown] {
            let resolved = EncoderSettings::resolve(&settings(), orientation).unwrap();
            assert_eq!(resolved.dimensions(), (720, 1280));
        }
    }

    #[test]
    fn test_landscape_swaps_dimensions() {
        for orientation in [Orientation::LandscapeLeft, Orientation::LandscapeRight] {
            let resolved = EncoderSettings::resolve(&settings(), orientation).unwrap();
            assert_eq!(resolved.dimensions(), (1280, 720));
        }
    }

    #[test]
    fn test_bitrates_pass_through() {
        let resolved = EncoderSettings::resolve(&settings(), Orientation::LandscapeLeft).unwrap();
        assert_eq!(resolved.bitrate, 3_000_000);
        assert_eq!(resolved.audio_bitrate, 128_000);
        assert_eq!(resolved.profile, H264Profile::HighAutoLevel);
        assert_eq!(resolved.keyframe_interval_secs, KEYFRAME_INTERVAL_SECS);
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        let mut video = settings();
        video.height = 0;
        assert!(matches!(
            EncoderSettings::resolve(&video, Orientation::Portrait),
            Err(EncoderError::InvalidSettings(_))
        ));
    }
}
