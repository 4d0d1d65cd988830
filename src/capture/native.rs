//! Hardware camera backend built on nokhwa.
//!
//! A nokhwa `Camera` is not `Send`, so each open stream runs on its own
//! worker thread that owns the device. The stream handle talks to it over
//! channels; dropping the handle stops the device.

use super::{
    CameraBackend, DeviceError, DeviceInfo, Frame, StreamRequest, TrackCapabilities,
    TrackConstraint, VideoStream, ZoomRange, BYTES_PER_PIXEL,
};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, ControlValueDescription, ControlValueSetter,
    FrameFormat, KnownCameraControl, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::{query, Camera, NokhwaError};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

const DEFAULT_FPS: u32 = 30;

fn map_error(err: NokhwaError) -> DeviceError {
    match err {
        NokhwaError::OpenDeviceError { .. } => DeviceError::NotFound(err.to_string()),
        NokhwaError::OpenStreamError { .. } => DeviceError::Busy(err.to_string()),
        NokhwaError::ReadFrameError { .. } => DeviceError::StreamEnded(err.to_string()),
        other => DeviceError::Backend(other.to_string()),
    }
}

fn worker_gone() -> DeviceError {
    DeviceError::StreamEnded("camera worker exited".to_owned())
}

/// Camera backend for local video devices.
///
/// Desktop devices carry no facing metadata, so requests with a facing
/// hint fail with [`DeviceError::Overconstrained`] and acquisition falls
/// through to device enumeration.
#[derive(Debug)]
pub struct NokhwaCamera {
    backend: ApiBackend,
}

impl Default for NokhwaCamera {
    fn default() -> Self {
        Self::new()
    }
}

impl NokhwaCamera {
    /// Creates a backend using the platform's default capture API.
    pub fn new() -> Self {
        Self {
            backend: ApiBackend::Auto,
        }
    }
}

impl CameraBackend for NokhwaCamera {
    fn open(&mut self, request: &StreamRequest) -> Result<Box<dyn VideoStream>, DeviceError> {
        if request.facing.is_some() {
            return Err(DeviceError::Overconstrained(
                "facing mode not reported by local devices".to_owned(),
            ));
        }

        let index = match &request.device_id {
            Some(id) => id
                .parse::<u32>()
                .map(CameraIndex::Index)
                .unwrap_or_else(|_| CameraIndex::String(id.clone())),
            None => CameraIndex::Index(0),
        };
        let format = match request.ideal_resolution {
            Some((width, height)) => RequestedFormat::new::<RgbAFormat>(
                RequestedFormatType::Closest(CameraFormat::new(
                    Resolution::new(width, height),
                    FrameFormat::MJPEG,
                    DEFAULT_FPS,
                )),
            ),
            None => RequestedFormat::new::<RgbAFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        };

        NokhwaStream::spawn(index, format).map(|s| Box::new(s) as Box<dyn VideoStream>)
    }

    fn enumerate_video_inputs(&mut self) -> Result<Vec<DeviceInfo>, DeviceError> {
        let devices = query(self.backend).map_err(map_error)?;
        Ok(devices
            .into_iter()
            .map(|info| DeviceInfo {
                id: info.index().to_string(),
                label: info.human_name(),
            })
            .collect())
    }
}

struct RawFrame {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

struct Opened {
    dimensions: (u32, u32),
    zoom: Option<(i64, i64)>,
}

enum Command {
    Grab(Sender<Result<RawFrame, DeviceError>>),
    SetZoom(i64, Sender<Result<(), DeviceError>>),
    Stop,
}

struct NokhwaStream {
    commands: Sender<Command>,
    worker: Option<JoinHandle<()>>,
    dimensions: (u32, u32),
    /// Raw zoom control range, if the device exposes one.
    zoom: Option<(i64, i64)>,
    sequence: u64,
    stopped: bool,
}

impl NokhwaStream {
    fn spawn(index: CameraIndex, format: RequestedFormat<'static>) -> Result<Self, DeviceError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker = std::thread::Builder::new()
            .name("isbn-scan-camera".to_owned())
            .spawn(move || run_worker(index, format, ready_tx, command_rx))
            .map_err(|e| DeviceError::Backend(format!("failed to start camera thread: {e}")))?;

        let opened = ready_rx.recv().map_err(|_| worker_gone())??;
        tracing::info!(
            width = opened.dimensions.0,
            height = opened.dimensions.1,
            "Camera stream opened"
        );

        Ok(Self {
            commands: command_tx,
            worker: Some(worker),
            dimensions: opened.dimensions,
            zoom: opened.zoom,
            sequence: 0,
            stopped: false,
        })
    }

    fn request<T>(
        &self,
        make: impl FnOnce(Sender<Result<T, DeviceError>>) -> Command,
    ) -> Result<T, DeviceError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.commands.send(make(reply_tx)).map_err(|_| worker_gone())?;
        reply_rx.recv().map_err(|_| worker_gone())?
    }
}

impl VideoStream for NokhwaStream {
    fn dimensions(&self) -> Option<(u32, u32)> {
        (!self.stopped).then_some(self.dimensions)
    }

    fn grab(&mut self, target: &mut Frame) -> Result<(), DeviceError> {
        if self.stopped {
            return Err(DeviceError::StreamEnded("camera stream stopped".to_owned()));
        }
        let raw = self.request(Command::Grab)?;
        let expected = raw.width as usize * raw.height as usize * BYTES_PER_PIXEL;
        if raw.rgba.len() != expected {
            return Err(DeviceError::Backend(format!(
                "frame size mismatch: {} bytes for {}x{}",
                raw.rgba.len(),
                raw.width,
                raw.height
            )));
        }
        self.sequence += 1;
        self.dimensions = (raw.width, raw.height);
        target
            .prepare(raw.width, raw.height, self.sequence)
            .copy_from_slice(&raw.rgba);
        Ok(())
    }

    fn track_capabilities(&self) -> TrackCapabilities {
        // Zoom is exposed as a factor relative to the control's minimum.
        let zoom = self.zoom.map(|(min, max)| ZoomRange {
            min: 1.0,
            max: max as f64 / min.max(1) as f64,
        });
        TrackCapabilities {
            focus_modes: Vec::new(),
            zoom,
        }
    }

    fn apply(&mut self, constraint: TrackConstraint) -> Result<(), DeviceError> {
        match constraint {
            TrackConstraint::Zoom(factor) => {
                let (min, max) = self
                    .zoom
                    .ok_or_else(|| DeviceError::Overconstrained("zoom".to_owned()))?;
                let raw = ((min.max(1) as f64) * factor).round() as i64;
                self.request(|reply| Command::SetZoom(raw.clamp(min, max), reply))
            }
            TrackConstraint::Focus(mode) => Err(DeviceError::Overconstrained(format!(
                "focus mode {mode:?}"
            ))),
        }
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        let _ = self.commands.send(Command::Stop);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                tracing::warn!("Camera worker panicked");
            }
        }
    }
}

impl Drop for NokhwaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

fn open_camera(index: CameraIndex, format: RequestedFormat<'static>) -> Result<Camera, NokhwaError> {
    let mut camera = Camera::new(index, format)?;
    camera.open_stream()?;
    Ok(camera)
}

fn zoom_range(camera: &Camera) -> Option<(i64, i64)> {
    let control = camera.camera_control(KnownCameraControl::Zoom).ok()?;
    match control.description() {
        ControlValueDescription::IntegerRange { min, max, .. } if max > min => Some((*min, *max)),
        _ => None,
    }
}

fn read_frame(camera: &mut Camera) -> Result<RawFrame, DeviceError> {
    let buffer = camera.frame().map_err(map_error)?;
    let image = buffer.decode_image::<RgbAFormat>().map_err(map_error)?;
    Ok(RawFrame {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

fn run_worker(
    index: CameraIndex,
    format: RequestedFormat<'static>,
    ready: Sender<Result<Opened, DeviceError>>,
    commands: Receiver<Command>,
) {
    let mut camera = match open_camera(index, format) {
        Ok(camera) => camera,
        Err(e) => {
            let _ = ready.send(Err(map_error(e)));
            return;
        }
    };

    let resolution = camera.resolution();
    let opened = Opened {
        dimensions: (resolution.width(), resolution.height()),
        zoom: zoom_range(&camera),
    };
    if ready.send(Ok(opened)).is_err() {
        let _ = camera.stop_stream();
        return;
    }

    for command in commands {
        match command {
            Command::Grab(reply) => {
                let _ = reply.send(read_frame(&mut camera));
            }
            Command::SetZoom(value, reply) => {
                let result = camera
                    .set_camera_control(KnownCameraControl::Zoom, ControlValueSetter::Integer(value))
                    .map_err(map_error);
                let _ = reply.send(result);
            }
            Command::Stop => break,
        }
    }

    if let Err(e) = camera.stop_stream() {
        tracing::debug!(error = %e, "Failed to stop camera stream");
    }
}
