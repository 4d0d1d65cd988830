//! Metrics collection and registry.

use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Cumulative counts kept by scan sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Sessions started.
    pub sessions: u64,
    /// Whether a session currently holds the camera.
    pub session_active: bool,
    /// Decode attempts.
    pub attempts: u64,
    /// Attempts without a symbol.
    pub decode_misses: u64,
    /// Decoded symbols that failed validation.
    pub invalid_candidates: u64,
    /// Current consecutive identical reads.
    pub consecutive_hits: u32,
    /// Confirmed detections.
    pub confirmations: u64,
    /// Sessions ended by a device error.
    pub device_errors: u64,
}

/// Prometheus metrics registry for scan sessions.
pub struct MetricsRegistry {
    registry: Registry,

    sessions_total: IntCounter,
    session_active: IntGauge,
    attempts_total: IntCounter,
    decode_misses_total: IntCounter,
    invalid_candidates_total: IntCounter,
    consecutive_hits: IntGauge,
    confirmations_total: IntCounter,
    device_errors_total: IntCounter,
}

impl MetricsRegistry {
    /// Creates a new metrics registry with all scan metrics registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let sessions_total =
            IntCounter::new("isbn_scan_sessions_total", "Total scan sessions started")?;
        let session_active = IntGauge::new(
            "isbn_scan_session_active",
            "Whether a scan session currently holds the camera (1=active)",
        )?;
        let attempts_total =
            IntCounter::new("isbn_scan_attempts_total", "Total decode attempts")?;
        let decode_misses_total = IntCounter::new(
            "isbn_scan_decode_misses_total",
            "Decode attempts that found no barcode",
        )?;
        let invalid_candidates_total = IntCounter::new(
            "isbn_scan_invalid_candidates_total",
            "Decoded payloads rejected by ISBN validation",
        )?;
        let consecutive_hits = IntGauge::new(
            "isbn_scan_consecutive_hits",
            "Consecutive identical reads of the current candidate",
        )?;
        let confirmations_total = IntCounter::new(
            "isbn_scan_confirmations_total",
            "Total confirmed ISBN detections",
        )?;
        let device_errors_total = IntCounter::new(
            "isbn_scan_device_errors_total",
            "Scan sessions ended by a camera error",
        )?;

        registry.register(Box::new(sessions_total.clone()))?;
        registry.register(Box::new(session_active.clone()))?;
        registry.register(Box::new(attempts_total.clone()))?;
        registry.register(Box::new(decode_misses_total.clone()))?;
        registry.register(Box::new(invalid_candidates_total.clone()))?;
        registry.register(Box::new(consecutive_hits.clone()))?;
        registry.register(Box::new(confirmations_total.clone()))?;
        registry.register(Box::new(device_errors_total.clone()))?;

        Ok(Self {
            registry,
            sessions_total,
            session_active,
            attempts_total,
            decode_misses_total,
            invalid_candidates_total,
            consecutive_hits,
            confirmations_total,
            device_errors_total,
        })
    }

    /// Updates all metrics from a snapshot.
    ///
    /// Counters only move forward; a snapshot lower than the current
    /// counter value leaves it unchanged.
    pub fn update(&self, snapshot: &MetricsSnapshot) {
        advance(&self.sessions_total, snapshot.sessions);
        self.session_active.set(i64::from(snapshot.session_active));
        advance(&self.attempts_total, snapshot.attempts);
        advance(&self.decode_misses_total, snapshot.decode_misses);
        advance(&self.invalid_candidates_total, snapshot.invalid_candidates);
        self.consecutive_hits.set(i64::from(snapshot.consecutive_hits));
        advance(&self.confirmations_total, snapshot.confirmations);
        advance(&self.device_errors_total, snapshot.device_errors);
    }

    /// Reads the current values back into a snapshot.
    ///
    /// A new session starts counting from here so that successive sessions
    /// sharing one registry keep the counters cumulative.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions: self.sessions_total.get(),
            session_active: self.session_active.get() != 0,
            attempts: self.attempts_total.get(),
            decode_misses: self.decode_misses_total.get(),
            invalid_candidates: self.invalid_candidates_total.get(),
            consecutive_hits: u32::try_from(self.consecutive_hits.get()).unwrap_or(0),
            confirmations: self.confirmations_total.get(),
            device_errors: self.device_errors_total.get(),
        }
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

fn advance(counter: &IntCounter, target: u64) {
    let current = counter.get();
    if target > current {
        counter.inc_by(target - current);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_creation() {
        let registry = MetricsRegistry::new();
        assert!(registry.is_ok());
    }

    #[test]
    fn test_metrics_update() {
        let registry = MetricsRegistry::new().unwrap();

        let snapshot = MetricsSnapshot {
            sessions: 1,
            session_active: true,
            attempts: 10,
            decode_misses: 7,
            invalid_candidates: 1,
            consecutive_hits: 1,
            confirmations: 0,
            device_errors: 0,
        };

        registry.update(&snapshot);

        let output = registry.encode().unwrap();
        assert!(output.contains("isbn_scan_session_active 1"));
        assert!(output.contains("isbn_scan_attempts_total 10"));
        assert!(output.contains("isbn_scan_decode_misses_total 7"));
    }

    #[test]
    fn test_counters_do_not_go_backwards() {
        let registry = MetricsRegistry::new().unwrap();
        registry.update(&MetricsSnapshot {
            attempts: 5,
            ..Default::default()
        });
        registry.update(&MetricsSnapshot {
            attempts: 3,
            ..Default::default()
        });

        let output = registry.encode().unwrap();
        assert!(output.contains("isbn_scan_attempts_total 5"));
        assert!(output.contains("isbn_scan_session_active 0"));
    }

    #[test]
    fn test_snapshot_reads_back() {
        let registry = MetricsRegistry::new().unwrap();
        let snapshot = MetricsSnapshot {
            sessions: 2,
            session_active: false,
            attempts: 40,
            decode_misses: 30,
            invalid_candidates: 2,
            consecutive_hits: 0,
            confirmations: 2,
            device_errors: 0,
        };
        registry.update(&snapshot);
        assert_eq!(registry.snapshot(), snapshot);
    }

    #[test]
    fn test_metrics_encode() {
        let registry = MetricsRegistry::new().unwrap();
        let output = registry.encode().unwrap();

        assert!(output.contains("isbn_scan_sessions_total"));
        assert!(output.contains("isbn_scan_confirmations_total"));
        assert!(output.contains("isbn_scan_device_errors_total"));
    }
}
