//! ISBN Scan Library
//!
//! Live recognition of ISBN barcodes (EAN-13) from a camera stream.
//! A scan session acquires a rear-facing camera, samples frames at a fixed
//! cadence, decodes the lower band of each frame, and reports a value only
//! after it has been read the same way on consecutive attempts.
//!
//! # Architecture
//!
//! The system follows an explicit data flow:
//!
//! ```text
//! capture → conditioning → decode → stability
//!     ↑                                  ↓
//!     └──────────── session ─────────────┘
//! ```
//!
//! - [`capture`]: camera acquisition with fallbacks, frame grabbing, release
//! - [`conditioning`]: crop to the barcode band and binarize
//! - [`decode`]: native scanline detector or software fallback, payload
//!   normalization
//! - [`stability`]: consecutive-match confirmation
//! - [`session`]: the polling loop, cancellation and callbacks
//!
//! # Example
//!
//! ```no_run
//! use isbn_scan::{CancelToken, MockCamera, ScanConfig, ScanOutcome, ScanSession};
//!
//! # async fn demo() -> Result<(), isbn_scan::ScanError> {
//! let camera = MockCamera::new().with_barcode("9780131103627");
//! let session = ScanSession::new(camera, ScanConfig::default());
//!
//! let outcome = session
//!     .run(
//!         CancelToken::new(),
//!         |isbn| println!("found {isbn}"),
//!         || println!("scanner closed"),
//!     )
//!     .await?;
//! assert!(matches!(outcome, ScanOutcome::Detected(_)));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod conditioning;
pub mod config;
pub mod decode;
pub mod isbn;
pub mod lookup;
pub mod metrics;
pub mod session;
pub mod stability;

// Re-export commonly used types at crate root
pub use capture::{CameraBackend, DeviceError, Frame, FrameSource, MockCamera};
pub use conditioning::{ConditionedFrame, FrameConditioner};
pub use config::{ConfigError, ScanConfig};
pub use decode::{DecodeCandidate, DecodeError, SymbolDecoder};
pub use isbn::Isbn;
pub use metrics::MetricsRegistry;
pub use session::{CancelToken, Detection, ScanError, ScanHandle, ScanOutcome, ScanSession};
pub use stability::{StabilityGate, Verdict};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
