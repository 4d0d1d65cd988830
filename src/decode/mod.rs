//! Barcode decoding.
//!
//! Two interchangeable paths produce [`DecodeCandidate`]s:
//!
//! - **native**: a [`BarcodeDetector`] restricted to EAN-13, fed the
//!   conditioned band of each frame;
//! - **software**: a [`FrameDecoder`] fed the raw frame, doing its own
//!   sampling.
//!
//! The path is chosen once per session by [`SymbolDecoder::select`].

pub mod ean13;

mod candidate;
mod native;
mod software;

pub use candidate::{is_valid, is_valid_normalized, normalize, DecodeCandidate, MAX_PAYLOAD_LEN};
pub use native::ScanlineDetector;
pub use software::SampledDecoder;

use crate::capture::{Frame, PlatformCapabilities};
use crate::conditioning::{ConditionedFrame, FrameConditioner};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Outcome of a decode attempt that produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// No symbol in this attempt. Expected and frequent.
    #[error("no barcode found")]
    NotFound,
    /// The decoder itself failed.
    #[error("decoder failure: {0}")]
    Failed(String),
}

/// Platform EAN-13 detector working on conditioned frames.
pub trait BarcodeDetector: Send {
    /// Returns every symbol found, possibly none.
    fn detect(&mut self, frame: &ConditionedFrame) -> Vec<DecodeCandidate>;
}

/// General-purpose decoder working on raw frames.
pub trait FrameDecoder: Send {
    /// Attempts one decode; [`DecodeError::NotFound`] means "nothing this time".
    fn decode_once(&mut self, frame: &Frame) -> Result<DecodeCandidate, DecodeError>;
}

/// Configured choice of decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecoderPreference {
    /// Native when the platform offers it, software otherwise.
    #[default]
    Auto,
    /// Always native.
    Native,
    /// Always software.
    Software,
}

/// Which path a [`SymbolDecoder`] runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderKind {
    /// Conditioned band through a [`BarcodeDetector`].
    Native,
    /// Raw frame through a [`FrameDecoder`].
    Software,
}

/// The decoder used for a whole session.
pub enum SymbolDecoder {
    /// Native fast path.
    Native {
        /// Detector fed with conditioned frames.
        detector: Box<dyn BarcodeDetector>,
        /// Crop and threshold applied before detection.
        conditioner: FrameConditioner,
    },
    /// Software fallback.
    Software(Box<dyn FrameDecoder>),
}

impl SymbolDecoder {
    /// Native path with the built-in scanline detector.
    pub fn native(conditioner: FrameConditioner) -> Self {
        Self::Native {
            detector: Box::new(ScanlineDetector::default()),
            conditioner,
        }
    }

    /// Software path with the built-in sampled decoder.
    pub fn software() -> Self {
        Self::Software(Box::new(SampledDecoder::default()))
    }

    /// Picks the path from preference and platform capability.
    pub fn select(
        preference: DecoderPreference,
        capabilities: PlatformCapabilities,
        conditioner: FrameConditioner,
    ) -> Self {
        let native = match preference {
            DecoderPreference::Auto => capabilities.native_barcode_detection,
            DecoderPreference::Native => true,
            DecoderPreference::Software => false,
        };
        if native {
            Self::native(conditioner)
        } else {
            Self::software()
        }
    }

    /// Which path this decoder runs.
    pub fn kind(&self) -> DecoderKind {
        match self {
            Self::Native { .. } => DecoderKind::Native,
            Self::Software(_) => DecoderKind::Software,
        }
    }

    /// Runs one decode attempt against the working frame.
    pub fn decode(&mut self, frame: &Frame) -> Result<DecodeCandidate, DecodeError> {
        match self {
            Self::Native {
                detector,
                conditioner,
            } => {
                let conditioned = conditioner.condition(frame);
                detector
                    .detect(&conditioned)
                    .into_iter()
                    .next()
                    .ok_or(DecodeError::NotFound)
            }
            Self::Software(decoder) => decoder.decode_once(frame),
        }
    }
}

impl std::fmt::Debug for SymbolDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SymbolDecoder").field(&self.kind()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(native: bool) -> PlatformCapabilities {
        PlatformCapabilities {
            native_barcode_detection: native,
        }
    }

    #[test]
    fn test_selection() {
        let c = FrameConditioner::default;
        assert_eq!(
            SymbolDecoder::select(DecoderPreference::Auto, caps(true), c()).kind(),
            DecoderKind::Native
        );
        assert_eq!(
            SymbolDecoder::select(DecoderPreference::Auto, caps(false), c()).kind(),
            DecoderKind::Software
        );
        assert_eq!(
            SymbolDecoder::select(DecoderPreference::Software, caps(true), c()).kind(),
            DecoderKind::Software
        );
        assert_eq!(
            SymbolDecoder::select(DecoderPreference::Native, caps(false), c()).kind(),
            DecoderKind::Native
        );
    }

    struct Fixed(Vec<&'static str>);

    impl BarcodeDetector for Fixed {
        fn detect(&mut self, _frame: &ConditionedFrame) -> Vec<DecodeCandidate> {
            self.0.iter().map(|s| DecodeCandidate::from_raw(s)).collect()
        }
    }

    #[test]
    fn test_native_takes_first_result() {
        let mut decoder = SymbolDecoder::Native {
            detector: Box::new(Fixed(vec!["978-0306406157", "9780131103627"])),
            conditioner: FrameConditioner::default(),
        };
        let frame = Frame::filled(64, 48, [255, 255, 255, 255]);
        assert_eq!(decoder.decode(&frame).unwrap().value(), "9780306406157");

        let mut empty = SymbolDecoder::Native {
            detector: Box::new(Fixed(Vec::new())),
            conditioner: FrameConditioner::default(),
        };
        assert_eq!(empty.decode(&frame), Err(DecodeError::NotFound));
    }

    #[test]
    fn test_both_paths_read_mock_frame() {
        use crate::capture::{CameraBackend, MockCamera, StreamRequest};

        let mut camera = MockCamera::new().with_barcode("9780131103627");
        let mut stream = camera.open(&StreamRequest::default()).unwrap();
        let mut frame = Frame::empty();
        stream.grab(&mut frame).unwrap();

        for mut decoder in [SymbolDecoder::native(FrameConditioner::default()), SymbolDecoder::software()] {
            let candidate = decoder.decode(&frame).unwrap();
            assert_eq!(candidate.value(), "9780131103627", "{:?}", decoder.kind());
        }
    }
}
