//! Read confirmation.
//!
//! A single decode is not trustworthy: motion blur and partial occlusion
//! produce plausible wrong reads. A value is only confirmed once the same
//! payload has been read on consecutive decode attempts.

mod gate;

pub use gate::{StabilityGate, StabilityState, Verdict};
