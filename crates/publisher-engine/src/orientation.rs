//! Device orientation tracking.

use tracing::debug;

use publisher_ipc::{DeviceOrientation, Orientation};

/// Map a physical device orientation to a capture orientation.
///
/// Landscape sides are mirrored to match how the capture sensor is mounted.
/// Flat and unknown orientations have no capture mapping.
pub fn capture_orientation(device: DeviceOrientation) -> Option<Orientation> {
    match device {
        DeviceOrientation::Portrait => Some(Orientation::Portrait),
        DeviceOrientation::PortraitUpsideDown => Some(Orientation::PortraitUpsideDown),
        DeviceOrientation::LandscapeLeft => Some(Orientation::LandscapeRight),
        DeviceOrientation::LandscapeRight => Some(Orientation::LandscapeLeft),
        DeviceOrientation::FaceUp | DeviceOrientation::FaceDown | DeviceOrientation::Unknown => {
            None
        }
    }
}

/// Active capture orientation and the orientations the host allows.
#[derive(Debug, Clone)]
pub struct OrientationTracker {
    current: Orientation,
    allowed: Vec<Orientation>,
}

impl OrientationTracker {
    /// Create a tracker starting in `current`.
    pub fn new(current: Orientation, allowed: Vec<Orientation>) -> Self {
        Self { current, allowed }
    }

    /// The active capture orientation.
    pub fn current(&self) -> Orientation {
        self.current
    }

    /// Replace the allow-list.
    pub fn set_allowed(&mut self, allowed: Vec<Orientation>) {
        self.allowed = allowed;
    }

    /// Apply a device orientation change.
    ///
    /// Returns the new capture orientation, or `None` when the change is
    /// ignored: unmapped, not allowed, or already active.
    pub fn accept(&mut self, device: DeviceOrientation) -> Option<Orientation> {
        let Some(orientation) = capture_orientation(device) else {
            debug!(?device, "No capture orientation for device orientation");
            return None;
        };

        if !self.allowed.contains(&orientation) {
            debug!(%orientation, "Orientation not allowed");
            return None;
        }

        if orientation == self.current {
            return None;
        }

        self.current = orientation;
        Some(orientation)
    }
}
