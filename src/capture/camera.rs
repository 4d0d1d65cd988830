//! Camera abstraction for frame capture.
//!
//! This module provides a trait-based abstraction over camera hardware,
//! allowing for both real camera input and mock implementations for testing.
//! A [`CameraBackend`] opens streams from a [`StreamRequest`]; the opened
//! [`VideoStream`] delivers RGBA frames into a caller-owned buffer.

use super::Frame;
use thiserror::Error;

/// Errors that can occur while acquiring or reading a camera.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    #[error("camera permission denied: {0}")]
    PermissionDenied(String),
    #[error("camera device not found: {0}")]
    NotFound(String),
    #[error("camera is busy or unreadable: {0}")]
    Busy(String),
    #[error("camera cannot satisfy the requested constraints: {0}")]
    Overconstrained(String),
    #[error("camera stream ended: {0}")]
    StreamEnded(String),
    #[error("camera backend error: {0}")]
    Backend(String),
}

impl DeviceError {
    /// Stable name of the error kind, shown to the user next to the message.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "PermissionDenied",
            Self::NotFound(_) => "NotFound",
            Self::Busy(_) => "Busy",
            Self::Overconstrained(_) => "Overconstrained",
            Self::StreamEnded(_) => "StreamEnded",
            Self::Backend(_) => "Backend",
        }
    }

    /// Underlying detail message.
    pub fn message(&self) -> &str {
        match self {
            Self::PermissionDenied(m)
            | Self::NotFound(m)
            | Self::Busy(m)
            | Self::Overconstrained(m)
            | Self::StreamEnded(m)
            | Self::Backend(m) => m,
        }
    }

    /// User-facing status line for a failed scan.
    pub fn status_message(&self) -> String {
        format!("Camera unavailable ({}): {}", self.name(), self.message())
    }
}

/// Which way a camera faces relative to the device screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacingMode {
    /// Rear camera, pointing away from the user.
    Environment,
    /// Front camera, pointing at the user.
    User,
}

/// Constraints for opening a stream.
///
/// `facing` and `device_id` are never combined in one request; some
/// platforms reject a facing hint next to an explicit device identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamRequest {
    /// Orientation hint.
    pub facing: Option<FacingMode>,
    /// Explicit device identity from [`CameraBackend::enumerate_video_inputs`].
    pub device_id: Option<String>,
    /// Preferred resolution; backends pick the closest they support.
    pub ideal_resolution: Option<(u32, u32)>,
}

/// A video input reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Identity usable in [`StreamRequest::device_id`].
    pub id: String,
    /// Human-readable label, possibly empty.
    pub label: String,
}

/// Focus behaviour a track may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusMode {
    /// Lens refocuses continuously.
    Continuous,
    /// Single autofocus pass.
    Auto,
    /// Manual focus.
    Manual,
}

/// Zoom range reported by a track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomRange {
    /// Minimum zoom factor.
    pub min: f64,
    /// Maximum zoom factor.
    pub max: f64,
}

/// Optional controls exposed by an open stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackCapabilities {
    /// Supported focus modes; empty if focus cannot be controlled.
    pub focus_modes: Vec<FocusMode>,
    /// Zoom range, if zoom can be controlled.
    pub zoom: Option<ZoomRange>,
}

/// A single advanced control applied after acquisition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackConstraint {
    /// Set the focus mode.
    Focus(FocusMode),
    /// Set the zoom factor.
    Zoom(f64),
}

/// What the running platform can do for barcode detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Whether the native EAN-13 fast path is available.
    pub native_barcode_detection: bool,
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self {
            native_barcode_detection: true,
        }
    }
}

/// An open camera stream.
pub trait VideoStream: Send {
    /// Current frame dimensions, or `None` while the stream has not
    /// produced a frame yet.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Copies the current picture into `target`, resizing it to the
    /// current dimensions.
    fn grab(&mut self, target: &mut Frame) -> Result<(), DeviceError>;

    /// Reports optional controls.
    fn track_capabilities(&self) -> TrackCapabilities;

    /// Applies one advanced control.
    fn apply(&mut self, constraint: TrackConstraint) -> Result<(), DeviceError>;

    /// Stops all tracks. Must be idempotent.
    fn stop(&mut self);
}

/// Trait for camera implementations.
///
/// This abstraction allows swapping between real camera hardware
/// and mock implementations for testing.
pub trait CameraBackend: Send {
    /// Opens a stream matching the request.
    fn open(&mut self, request: &StreamRequest) -> Result<Box<dyn VideoStream>, DeviceError>;

    /// Lists available video inputs.
    fn enumerate_video_inputs(&mut self) -> Result<Vec<DeviceInfo>, DeviceError>;

    /// Reports platform detection capabilities.
    fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_message_names_error() {
        let err = DeviceError::PermissionDenied("user dismissed prompt".to_owned());
        assert_eq!(err.name(), "PermissionDenied");
        assert_eq!(
            err.status_message(),
            "Camera unavailable (PermissionDenied): user dismissed prompt"
        );
    }

    #[test]
    fn test_default_request_is_unconstrained() {
        let request = StreamRequest::default();
        assert!(request.facing.is_none());
        assert!(request.device_id.is_none());
        assert!(request.ideal_resolution.is_none());
    }
}
