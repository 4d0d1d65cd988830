//! Camera acquisition with fallback device selection.
//!
//! Acquisition tries, in order: a rear-facing hint, a rear camera picked
//! by label from the device list, then any camera at all. After a stream
//! is open, focus and zoom are tuned on a best-effort basis.

use super::{
    CameraBackend, DeviceError, DeviceInfo, FacingMode, FocusMode, Frame, StreamRequest,
    TrackCapabilities, TrackConstraint, VideoStream,
};
use crate::config::CameraConfig;

/// Acquisition strategies in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStrategy {
    /// Rear-facing hint with the ideal resolution.
    FacingHint,
    /// Explicit device chosen by label.
    LabelledDevice,
    /// No constraints.
    AnyDevice,
}

impl AcquireStrategy {
    /// All strategies, in fallback order.
    pub const ORDER: [AcquireStrategy; 3] = [
        AcquireStrategy::FacingHint,
        AcquireStrategy::LabelledDevice,
        AcquireStrategy::AnyDevice,
    ];
}

/// Owns the camera stream for one scan session.
///
/// The stream is stopped by [`FrameSource::release`] or on drop,
/// whichever comes first.
pub struct FrameSource {
    stream: Option<Box<dyn VideoStream>>,
    strategy: Option<AcquireStrategy>,
}

impl FrameSource {
    /// Acquires a stream from `backend`, trying each strategy in turn.
    ///
    /// Returns the error of the last strategy tried when all fail.
    pub fn acquire(
        backend: &mut dyn CameraBackend,
        config: &CameraConfig,
    ) -> Result<Self, DeviceError> {
        let mut last_error = DeviceError::NotFound("no camera strategy attempted".to_owned());

        for strategy in AcquireStrategy::ORDER {
            let request = match build_request(strategy, backend, config) {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(?strategy, error = %e, "Skipping acquisition strategy");
                    last_error = e;
                    continue;
                }
            };

            match backend.open(&request) {
                Ok(mut stream) => {
                    tracing::info!(?strategy, device = ?request.device_id, "Camera acquired");
                    apply_tuning(stream.as_mut(), config);
                    return Ok(Self {
                        stream: Some(stream),
                        strategy: Some(strategy),
                    });
                }
                Err(e) => {
                    tracing::debug!(?strategy, error = %e, "Acquisition strategy failed");
                    last_error = e;
                }
            }
        }

        tracing::warn!(error = %last_error, "All camera acquisition strategies failed");
        Err(last_error)
    }

    /// Strategy that produced the stream, if still held.
    pub fn strategy(&self) -> Option<AcquireStrategy> {
        self.strategy
    }

    /// Returns true while a stream is held.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Current stream dimensions; `None` if not yet producing frames or released.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.stream.as_ref().and_then(|s| s.dimensions())
    }

    /// Copies the current picture into the working buffer.
    pub fn grab(&mut self, target: &mut Frame) -> Result<(), DeviceError> {
        match self.stream.as_mut() {
            Some(stream) => stream.grab(target),
            None => Err(DeviceError::StreamEnded("stream already released".to_owned())),
        }
    }

    /// Stops all tracks. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop();
            tracing::info!("Camera released");
        }
        self.strategy = None;
    }
}

impl Drop for FrameSource {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for FrameSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameSource")
            .field("open", &self.is_open())
            .field("strategy", &self.strategy)
            .finish()
    }
}

fn build_request(
    strategy: AcquireStrategy,
    backend: &mut dyn CameraBackend,
    config: &CameraConfig,
) -> Result<StreamRequest, DeviceError> {
    let ideal = Some((config.ideal_width, config.ideal_height));
    match strategy {
        AcquireStrategy::FacingHint => Ok(StreamRequest {
            facing: Some(FacingMode::Environment),
            device_id: None,
            ideal_resolution: ideal,
        }),
        AcquireStrategy::LabelledDevice => {
            let devices = backend.enumerate_video_inputs()?;
            let device = pick_rear_device(&devices, &config.label_keywords).ok_or_else(|| {
                DeviceError::NotFound(format!(
                    "no rear camera among {} video inputs",
                    devices.len()
                ))
            })?;
            Ok(StreamRequest {
                facing: None,
                device_id: Some(device.id.clone()),
                ideal_resolution: ideal,
            })
        }
        AcquireStrategy::AnyDevice => Ok(StreamRequest::default()),
    }
}

/// Picks the first device whose label contains any keyword, ignoring case.
pub(crate) fn pick_rear_device<'a>(
    devices: &'a [DeviceInfo],
    keywords: &[String],
) -> Option<&'a DeviceInfo> {
    devices.iter().find(|device| {
        let label = device.label.to_lowercase();
        keywords
            .iter()
            .any(|keyword| !keyword.is_empty() && label.contains(&keyword.to_lowercase()))
    })
}

/// Computes the tuning constraints a track supports.
pub(crate) fn tuning_constraints(
    capabilities: &TrackCapabilities,
    preferred_zoom: f64,
) -> Vec<TrackConstraint> {
    let mut constraints = Vec::with_capacity(2);

    if capabilities.focus_modes.contains(&FocusMode::Continuous) {
        constraints.push(TrackConstraint::Focus(FocusMode::Continuous));
    } else if capabilities.focus_modes.contains(&FocusMode::Auto) {
        constraints.push(TrackConstraint::Focus(FocusMode::Auto));
    }

    if let Some(range) = capabilities.zoom {
        if range.min <= range.max {
            constraints.push(TrackConstraint::Zoom(preferred_zoom.clamp(range.min, range.max)));
        }
    }

    constraints
}

/// Applies each supported constraint on its own; failures are ignored.
fn apply_tuning(stream: &mut dyn VideoStream, config: &CameraConfig) {
    let capabilities = stream.track_capabilities();
    for constraint in tuning_constraints(&capabilities, config.preferred_zoom) {
        match stream.apply(constraint) {
            Ok(()) => tracing::debug!(?constraint, "Applied camera tuning"),
            Err(e) => tracing::debug!(?constraint, error = %e, "Camera tuning not applied"),
        }
    }
}
