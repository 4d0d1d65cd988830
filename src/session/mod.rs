//! Scan session orchestration.
//!
//! A session owns the camera from acquisition to release and runs a
//! strictly sequential polling loop:
//!
//! ```text
//! acquire → loop { capture → (condition) → decode → gate } → release
//! ```
//!
//! It ends on a confirmed read, on cancellation, on an unrecoverable
//! camera error, or (optionally) after a maximum number of attempts. The
//! camera is released on every one of those paths, and also when the
//! session future is dropped while suspended.
//!
//! Grabbing and decoding block, so each attempt runs on tokio's blocking
//! pool. The stream, the working frame and the decoder move into the
//! attempt and come back with its result; at most one attempt is in
//! flight.

mod cancel;
mod stats;

pub use cancel::CancelToken;

use crate::capture::{CameraBackend, DeviceError, Frame, FrameSource};
use crate::conditioning::FrameConditioner;
use crate::config::ScanConfig;
use crate::decode::{DecodeCandidate, DecodeError, SymbolDecoder};
use crate::isbn::Isbn;
use crate::metrics::MetricsRegistry;
use crate::stability::{StabilityGate, Verdict};
use chrono::{DateTime, Utc};
use serde::Serialize;
use stats::SessionStats;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;

/// A confirmed read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    /// The confirmed ISBN.
    pub isbn: Isbn,
    /// When the read was confirmed.
    pub detected_at: DateTime<Utc>,
    /// Decode attempts the session made.
    pub attempts: u64,
}

/// How a session ended, other than by error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// A value was confirmed and delivered.
    Detected(Detection),
    /// The session was cancelled.
    Cancelled,
    /// The configured attempt limit was reached.
    Exhausted {
        /// Attempts made.
        attempts: u64,
    },
}

/// Terminal session failures.
#[derive(Debug, Error)]
pub enum ScanError {
    /// The camera could not be acquired or stopped producing frames.
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// The session task or a capture attempt panicked or was aborted.
    #[error("scan task failed: {0}")]
    Join(String),
}

impl ScanError {
    /// User-facing status line.
    pub fn status_message(&self) -> String {
        match self {
            Self::Device(e) => e.status_message(),
            Self::Join(m) => format!("Scanner stopped unexpectedly: {m}"),
        }
    }
}

/// Runs `on_close` when dropped.
struct CloseGuard<C: FnOnce()>(Option<C>);

impl<C: FnOnce()> Drop for CloseGuard<C> {
    fn drop(&mut self) {
        if let Some(on_close) = self.0.take() {
            on_close();
        }
    }
}

/// Everything a single capture-and-decode attempt needs.
///
/// Owned so it can move onto the blocking pool and back.
struct Capture {
    source: FrameSource,
    buffer: Frame,
    decoder: SymbolDecoder,
}

impl Capture {
    /// Grabs into the working frame and decodes it. The outer error is a
    /// camera failure; the inner result is the decode outcome.
    fn attempt(&mut self) -> Result<Result<DecodeCandidate, DecodeError>, DeviceError> {
        self.source.grab(&mut self.buffer)?;
        Ok(self.decoder.decode(&self.buffer))
    }
}

/// One scan from camera acquisition to confirmed read or cancellation.
pub struct ScanSession<B: CameraBackend> {
    backend: B,
    config: ScanConfig,
    decoder: Option<SymbolDecoder>,
    metrics: Option<Arc<MetricsRegistry>>,
}

impl<B: CameraBackend> ScanSession<B> {
    /// Creates a session over a camera backend.
    pub fn new(backend: B, config: ScanConfig) -> Self {
        Self {
            backend,
            config,
            decoder: None,
            metrics: None,
        }
    }

    /// Uses `decoder` instead of selecting one from platform capabilities.
    pub fn with_decoder(mut self, decoder: SymbolDecoder) -> Self {
        self.decoder = Some(decoder);
        self
    }

    /// Publishes session counters to `registry`.
    pub fn with_metrics(mut self, registry: Arc<MetricsRegistry>) -> Self {
        self.metrics = Some(registry);
        self
    }

    /// Runs the session to completion.
    ///
    /// `on_detected` is called at most once, with a confirmed ISBN, after
    /// the camera has been released. `on_close` is called exactly once
    /// when the session ends, whatever the reason.
    pub async fn run<D, C>(
        mut self,
        cancel: CancelToken,
        on_detected: D,
        on_close: C,
    ) -> Result<ScanOutcome, ScanError>
    where
        D: FnOnce(Isbn),
        C: FnOnce(),
    {
        let _close = CloseGuard(Some(on_close));
        let mut stats = SessionStats::begin(self.metrics.clone());

        let source = match FrameSource::acquire(&mut self.backend, &self.config.camera) {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!(status = %e.status_message(), "Scan session could not start");
                stats.device_error();
                return Err(e.into());
            }
        };

        let decoder = match self.decoder.take() {
            Some(decoder) => decoder,
            None => SymbolDecoder::select(
                self.config.session.decoder,
                self.backend.capabilities(),
                FrameConditioner::from_config(&self.config.conditioning),
            ),
        };

        let interval = self.config.session.poll_interval();
        let max_attempts = self.config.session.max_attempts;
        let mut gate = StabilityGate::new(self.config.session.required_matches);
        let mut attempts = 0u64;

        tracing::info!(
            decoder = ?decoder.kind(),
            interval_ms = interval.as_millis() as u64,
            "Scan loop started"
        );

        let mut capture = Some(Capture {
            source,
            buffer: Frame::empty(),
            decoder,
        });

        let result = loop {
            if cancel.is_cancelled() {
                tracing::info!(attempts, "Scan cancelled");
                break Ok(ScanOutcome::Cancelled);
            }
            if max_attempts.is_some_and(|max| attempts >= max) {
                tracing::info!(attempts, "Scan attempt limit reached");
                break Ok(ScanOutcome::Exhausted { attempts });
            }

            let Some(mut current) = capture.take() else {
                break Err(ScanError::Join("capture state lost".to_owned()));
            };
            if current.source.dimensions().is_none() {
                tracing::trace!("Stream not producing frames yet");
                capture = Some(current);
                tokio::time::sleep(interval).await;
                continue;
            }

            let joined = tokio::task::spawn_blocking(move || {
                let outcome = current.attempt();
                (current, outcome)
            })
            .await;
            let (returned, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tracing::warn!(error = %e, "Capture task failed");
                    break Err(ScanError::Join(e.to_string()));
                }
            };
            capture = Some(returned);

            let decoded = match outcome {
                Ok(decoded) => decoded,
                Err(e) => {
                    tracing::warn!(error = %e, "Camera stream failed");
                    stats.device_error();
                    break Err(ScanError::Device(e));
                }
            };
            attempts += 1;
            stats.attempt();

            if cancel.is_cancelled() {
                tracing::info!(attempts, "Scan cancelled, discarding in-flight result");
                break Ok(ScanOutcome::Cancelled);
            }

            match decoded {
                Ok(candidate) => {
                    let verdict = gate.observe(&candidate);
                    stats.observed(candidate.is_valid(), gate.state().consecutive_hits);
                    if let Verdict::Confirmed(value) = verdict {
                        match Isbn::try_from(value) {
                            Ok(isbn) => {
                                stats.confirmed();
                                break Ok(ScanOutcome::Detected(Detection {
                                    isbn,
                                    detected_at: Utc::now(),
                                    attempts,
                                }));
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "Confirmed value rejected");
                                gate.reset();
                            }
                        }
                    }
                }
                Err(DecodeError::NotFound) => {
                    tracing::trace!(attempt = attempts, "No barcode in frame");
                    stats.miss();
                }
                Err(e) => {
                    tracing::debug!(attempt = attempts, error = %e, "Decode attempt failed");
                    stats.miss();
                }
            }

            tokio::time::sleep(interval).await;
        };

        if let Some(mut capture) = capture.take() {
            capture.source.release();
        }

        if let Ok(ScanOutcome::Detected(detection)) = &result {
            tracing::info!(isbn = %detection.isbn, attempts, "ISBN detected");
            on_detected(detection.isbn.clone());
        }

        result
    }
}

impl<B: CameraBackend + 'static> ScanSession<B> {
    /// Spawns the session on the current tokio runtime.
    ///
    /// Must be called from within a runtime. Dropping the returned handle
    /// cancels the session.
    pub fn start<D, C>(self, on_detected: D, on_close: C) -> ScanHandle
    where
        D: FnOnce(Isbn) + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        let cancel = CancelToken::new();
        let task = tokio::spawn(self.run(cancel.clone(), on_detected, on_close));
        ScanHandle {
            cancel,
            task: Some(task),
        }
    }
}

/// Handle to a spawned session.
pub struct ScanHandle {
    cancel: CancelToken,
    task: Option<JoinHandle<Result<ScanOutcome, ScanError>>>,
}

impl ScanHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The session's cancellation token.
    pub fn token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Returns true once the session task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Waits for the session to end.
    pub async fn join(mut self) -> Result<ScanOutcome, ScanError> {
        match self.task.take() {
            Some(task) => task.await.map_err(|e| ScanError::Join(e.to_string()))?,
            None => Err(ScanError::Join("session already joined".to_owned())),
        }
    }
}

impl Drop for ScanHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}

impl std::fmt::Debug for ScanHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanHandle")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
