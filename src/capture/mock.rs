//! Mock camera for testing without hardware.
//!
//! Renders synthetic frames, optionally containing an EAN-13 symbol in the
//! lower band of the picture, and records what the scanner did with it.

use super::{
    AcquireStrategy, CameraBackend, DeviceError, DeviceInfo, FocusMode, Frame,
    PlatformCapabilities, StreamRequest, TrackCapabilities, TrackConstraint, VideoStream,
    BYTES_PER_PIXEL,
};
use crate::decode::ean13;
use std::cell::Cell;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

const BACKGROUND: [u8; 4] = [200, 200, 200, 255];
const LABEL: [u8; 4] = [245, 245, 245, 255];
const INK: [u8; 4] = [25, 25, 25, 255];

/// What the mock camera shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockScene {
    /// Plain background, no symbol.
    Blank,
    /// The same EAN-13 symbol on every frame.
    Barcode(String),
    /// One entry per grab; the last entry repeats once the list runs out.
    Sequence(Vec<Option<String>>),
}

impl MockScene {
    fn code_for(&self, grab_index: usize) -> Option<&str> {
        match self {
            Self::Blank => None,
            Self::Barcode(code) => Some(code),
            Self::Sequence(codes) => codes
                .get(grab_index)
                .or_else(|| codes.last())
                .and_then(|c| c.as_deref()),
        }
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    requests: Vec<StreamRequest>,
    open_streams: usize,
    stops: usize,
    grabs: usize,
    applied: Vec<TrackConstraint>,
}

/// Shared view of what happened to a [`MockCamera`] and its streams.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl MockProbe {
    fn lock(&self) -> MutexGuard<'_, ProbeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Every stream request received, in order.
    pub fn requests(&self) -> Vec<StreamRequest> {
        self.lock().requests.clone()
    }

    /// Streams opened and not yet stopped.
    pub fn open_streams(&self) -> usize {
        self.lock().open_streams
    }

    /// Number of stop calls that actually stopped a stream.
    pub fn stops(&self) -> usize {
        self.lock().stops
    }

    /// Number of frames grabbed.
    pub fn grabs(&self) -> usize {
        self.lock().grabs
    }

    /// Tuning constraints accepted by the stream.
    pub fn applied(&self) -> Vec<TrackConstraint> {
        self.lock().applied.clone()
    }
}

/// Mock camera backend that generates synthetic frames.
#[derive(Debug)]
pub struct MockCamera {
    width: u32,
    height: u32,
    scene: MockScene,
    devices: Vec<DeviceInfo>,
    failures: Vec<(AcquireStrategy, DeviceError)>,
    enumerate_error: Option<DeviceError>,
    warmup_polls: u32,
    end_after: Option<usize>,
    grab_latency: Option<Duration>,
    track_capabilities: TrackCapabilities,
    reject_focus: bool,
    capabilities: PlatformCapabilities,
    probe: MockProbe,
}

impl Default for MockCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCamera {
    /// Creates a 640×480 mock camera showing a blank scene.
    pub fn new() -> Self {
        Self {
            width: 640,
            height: 480,
            scene: MockScene::Blank,
            devices: Vec::new(),
            failures: Vec::new(),
            enumerate_error: None,
            warmup_polls: 0,
            end_after: None,
            grab_latency: None,
            track_capabilities: TrackCapabilities::default(),
            reject_focus: false,
            capabilities: PlatformCapabilities::default(),
            probe: MockProbe::default(),
        }
    }

    /// Sets the frame size.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Shows `code` on every frame.
    pub fn with_barcode(mut self, code: impl Into<String>) -> Self {
        self.scene = MockScene::Barcode(code.into());
        self
    }

    /// Sets the scene.
    pub fn with_scene(mut self, scene: MockScene) -> Self {
        self.scene = scene;
        self
    }

    /// Sets the devices reported by enumeration.
    pub fn with_devices(mut self, devices: Vec<DeviceInfo>) -> Self {
        self.devices = devices;
        self
    }

    /// Makes one acquisition strategy fail with `error`.
    pub fn fail_strategy(mut self, strategy: AcquireStrategy, error: DeviceError) -> Self {
        self.failures.retain(|(s, _)| *s != strategy);
        self.failures.push((strategy, error));
        self
    }

    /// Makes every acquisition strategy fail with `error`.
    pub fn fail_all(self, error: DeviceError) -> Self {
        AcquireStrategy::ORDER
            .into_iter()
            .fold(self, |camera, strategy| camera.fail_strategy(strategy, error.clone()))
    }

    /// Makes device enumeration fail.
    pub fn fail_enumeration(mut self, error: DeviceError) -> Self {
        self.enumerate_error = Some(error);
        self
    }

    /// Reports no dimensions for the first `polls` dimension queries.
    pub fn with_warmup(mut self, polls: u32) -> Self {
        self.warmup_polls = polls;
        self
    }

    /// Makes the stream fail with [`DeviceError::StreamEnded`] after
    /// `grabs` successful grabs.
    pub fn end_after(mut self, grabs: usize) -> Self {
        self.end_after = Some(grabs);
        self
    }

    /// Blocks the calling thread for `latency` on every grab, like a
    /// device waiting for its next frame.
    pub fn with_grab_latency(mut self, latency: Duration) -> Self {
        self.grab_latency = Some(latency);
        self
    }

    /// Sets the focus/zoom controls the stream reports.
    pub fn with_track_capabilities(mut self, capabilities: TrackCapabilities) -> Self {
        self.track_capabilities = capabilities;
        self
    }

    /// Makes the stream reject focus changes.
    pub fn reject_focus(mut self) -> Self {
        self.reject_focus = true;
        self
    }

    /// Reports the native detection path as unavailable.
    pub fn without_native_detection(mut self) -> Self {
        self.capabilities.native_barcode_detection = false;
        self
    }

    /// Returns a handle for inspecting camera activity.
    pub fn probe(&self) -> MockProbe {
        self.probe.clone()
    }

    fn strategy_of(request: &StreamRequest) -> AcquireStrategy {
        if request.facing.is_some() {
            AcquireStrategy::FacingHint
        } else if request.device_id.is_some() {
            AcquireStrategy::LabelledDevice
        } else {
            AcquireStrategy::AnyDevice
        }
    }
}

impl CameraBackend for MockCamera {
    fn open(&mut self, request: &StreamRequest) -> Result<Box<dyn VideoStream>, DeviceError> {
        self.probe.lock().requests.push(request.clone());

        if request.facing.is_some() && request.device_id.is_some() {
            return Err(DeviceError::Overconstrained(
                "facing hint combined with device id".to_owned(),
            ));
        }

        let strategy = Self::strategy_of(request);
        if let Some((_, error)) = self.failures.iter().find(|(s, _)| *s == strategy) {
            return Err(error.clone());
        }

        self.probe.lock().open_streams += 1;
        tracing::info!(?strategy, width = self.width, height = self.height, "MockCamera opened");

        Ok(Box::new(MockStream {
            width: self.width,
            height: self.height,
            scene: self.scene.clone(),
            warmup_remaining: Cell::new(self.warmup_polls),
            end_after: self.end_after,
            grab_latency: self.grab_latency,
            track_capabilities: self.track_capabilities.clone(),
            reject_focus: self.reject_focus,
            sequence: 0,
            stopped: false,
            probe: self.probe.clone(),
        }))
    }

    fn enumerate_video_inputs(&mut self) -> Result<Vec<DeviceInfo>, DeviceError> {
        match &self.enumerate_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.devices.clone()),
        }
    }

    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }
}

struct MockStream {
    width: u32,
    height: u32,
    scene: MockScene,
    warmup_remaining: Cell<u32>,
    end_after: Option<usize>,
    grab_latency: Option<Duration>,
    track_capabilities: TrackCapabilities,
    reject_focus: bool,
    sequence: u64,
    stopped: bool,
    probe: MockProbe,
}

impl VideoStream for MockStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        if self.stopped {
            return None;
        }
        let remaining = self.warmup_remaining.get();
        if remaining > 0 {
            self.warmup_remaining.set(remaining - 1);
            return None;
        }
        Some((self.width, self.height))
    }

    fn grab(&mut self, target: &mut Frame) -> Result<(), DeviceError> {
        if self.stopped {
            return Err(DeviceError::StreamEnded("mock stream stopped".to_owned()));
        }
        if self.end_after.is_some_and(|limit| self.sequence as usize >= limit) {
            return Err(DeviceError::StreamEnded("mock device unplugged".to_owned()));
        }
        if let Some(latency) = self.grab_latency {
            std::thread::sleep(latency);
        }

        let grab_index = {
            let mut state = self.probe.lock();
            state.grabs += 1;
            state.grabs - 1
        };
        self.sequence += 1;

        let pixels = target.prepare(self.width, self.height, self.sequence);
        for chunk in pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            chunk.copy_from_slice(&BACKGROUND);
        }
        if let Some(code) = self.scene.code_for(grab_index) {
            render_symbol(pixels, self.width, self.height, code);
        }
        Ok(())
    }

    fn track_capabilities(&self) -> TrackCapabilities {
        self.track_capabilities.clone()
    }

    fn apply(&mut self, constraint: TrackConstraint) -> Result<(), DeviceError> {
        if self.reject_focus && matches!(constraint, TrackConstraint::Focus(_)) {
            return Err(DeviceError::Overconstrained("focusMode".to_owned()));
        }
        if let TrackConstraint::Focus(FocusMode::Manual) = constraint {
            return Err(DeviceError::Overconstrained("manual focus".to_owned()));
        }
        self.probe.lock().applied.push(constraint);
        Ok(())
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let mut state = self.probe.lock();
        state.stops += 1;
        state.open_streams = state.open_streams.saturating_sub(1);
        tracing::info!("MockCamera stream stopped");
    }
}

/// Draws `code` centred in the lower band on a light label.
fn render_symbol(pixels: &mut [u8], width: u32, height: u32, code: &str) {
    let Some(modules) = ean13::encode_modules(code) else {
        return;
    };

    let module_px = ((width as usize * 6 / 10) / (modules.len() + 2 * ean13::QUIET_ZONE)).max(1);
    let symbol_px = modules.len() * module_px;
    let quiet_px = ean13::QUIET_ZONE * module_px;
    if symbol_px + 2 * quiet_px > width as usize {
        return;
    }

    let start_x = (width as usize - symbol_px) / 2;
    let label = (start_x - quiet_px)..(start_x + symbol_px + quiet_px);
    let label_rows = (height as usize * 58 / 100)..(height as usize * 82 / 100);
    let bar_rows = (height as usize * 60 / 100)..(height as usize * 80 / 100);
    let stride = width as usize * BYTES_PER_PIXEL;

    for y in label_rows {
        let row = &mut pixels[y * stride..(y + 1) * stride];
        for x in label.clone() {
            let dark = bar_rows.contains(&y)
                && x >= start_x
                && x < start_x + symbol_px
                && modules[(x - start_x) / module_px];
            let color = if dark { INK } else { LABEL };
            row[x * BYTES_PER_PIXEL..(x + 1) * BYTES_PER_PIXEL].copy_from_slice(&color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_lifecycle() {
        let mut camera = MockCamera::new();
        let probe = camera.probe();

        let mut stream = camera.open(&StreamRequest::default()).unwrap();
        assert_eq!(probe.open_streams(), 1);
        assert_eq!(stream.dimensions(), Some((640, 480)));

        let mut frame = Frame::empty();
        stream.grab(&mut frame).unwrap();
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 1);

        stream.grab(&mut frame).unwrap();
        assert_eq!(frame.sequence(), 2);
        assert_eq!(probe.grabs(), 2);

        stream.stop();
        stream.stop();
        assert_eq!(probe.stops(), 1);
        assert_eq!(probe.open_streams(), 0);
        assert!(matches!(
            stream.grab(&mut frame),
            Err(DeviceError::StreamEnded(_))
        ));
    }

    #[test]
    fn test_warmup_withholds_dimensions() {
        let mut camera = MockCamera::new().with_warmup(2);
        let stream = camera.open(&StreamRequest::default()).unwrap();

        assert_eq!(stream.dimensions(), None);
        assert_eq!(stream.dimensions(), None);
        assert_eq!(stream.dimensions(), Some((640, 480)));
    }

    #[test]
    fn test_rejects_facing_with_device_id() {
        let mut camera = MockCamera::new();
        let request = StreamRequest {
            facing: Some(super::super::FacingMode::Environment),
            device_id: Some("cam-1".to_owned()),
            ideal_resolution: None,
        };
        assert!(matches!(
            camera.open(&request),
            Err(DeviceError::Overconstrained(_))
        ));
    }

    #[test]
    fn test_renders_symbol_in_lower_band() {
        let mut camera = MockCamera::new().with_barcode("9780131103627");
        let mut stream = camera.open(&StreamRequest::default()).unwrap();
        let mut frame = Frame::empty();
        stream.grab(&mut frame).unwrap();

        // Top of the frame stays background, the band carries ink.
        assert!(frame.row(10).unwrap().chunks_exact(4).all(|p| p == BACKGROUND));
        assert!(frame.row(336).unwrap().chunks_exact(4).any(|p| p == INK));
    }

    #[test]
    fn test_sequence_repeats_last_entry() {
        let scene = MockScene::Sequence(vec![None, Some("9780306406157".to_owned())]);
        assert_eq!(scene.code_for(0), None);
        assert_eq!(scene.code_for(1), Some("9780306406157"));
        assert_eq!(scene.code_for(7), Some("9780306406157"));
    }
}
