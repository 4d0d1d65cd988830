//! Prometheus metrics for scan sessions.
//!
//! # Metrics Exposed
//!
//! - `isbn_scan_sessions_total` - Sessions started
//! - `isbn_scan_session_active` - 1 while a session holds the camera
//! - `isbn_scan_attempts_total` - Decode attempts
//! - `isbn_scan_decode_misses_total` - Attempts that found no symbol
//! - `isbn_scan_invalid_candidates_total` - Symbols rejected by normalization
//! - `isbn_scan_consecutive_hits` - Current stability count
//! - `isbn_scan_confirmations_total` - Confirmed detections
//! - `isbn_scan_device_errors_total` - Sessions ended by a camera error
//!
//! # Example
//!
//! ```no_run
//! use isbn_scan::metrics::{MetricsRegistry, MetricsSnapshot};
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//!
//! let snapshot = MetricsSnapshot {
//!     sessions: 1,
//!     session_active: true,
//!     attempts: 12,
//!     decode_misses: 9,
//!     invalid_candidates: 1,
//!     consecutive_hits: 1,
//!     confirmations: 0,
//!     device_errors: 0,
//! };
//!
//! registry.update(&snapshot);
//! ```

mod collector;
#[cfg(feature = "metrics")]
mod server;

pub use collector::{MetricsError, MetricsRegistry, MetricsSnapshot};
#[cfg(feature = "metrics")]
pub use server::{MetricsServer, MetricsServerConfig, ServerError};
