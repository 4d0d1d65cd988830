//! Camera input and frame handling.
//!
//! This module provides abstractions for acquiring a live camera stream
//! and pulling RGBA frames out of it. [`FrameSource`] owns the fallback
//! device-selection strategy and the stream's lifetime.

mod camera;
mod frame;
mod mock;
#[cfg(feature = "camera")]
mod native;
mod source;

pub use camera::{
    CameraBackend, DeviceError, DeviceInfo, FacingMode, FocusMode, PlatformCapabilities,
    StreamRequest, TrackCapabilities, TrackConstraint, VideoStream, ZoomRange,
};
pub use frame::{Frame, BYTES_PER_PIXEL};
pub use mock::{MockCamera, MockProbe, MockScene};
#[cfg(feature = "camera")]
pub use native::NokhwaCamera;
pub use source::{AcquireStrategy, FrameSource};
