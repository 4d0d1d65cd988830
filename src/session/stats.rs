//! Per-session counters published to the metrics registry.

use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use std::sync::Arc;

/// Counts what one session does and mirrors it into an optional registry.
///
/// Dropping the recorder marks the session inactive, so the gauge is
/// correct even when the session future is dropped mid-loop.
pub(crate) struct SessionStats {
    registry: Option<Arc<MetricsRegistry>>,
    snapshot: MetricsSnapshot,
}

impl SessionStats {
    pub(crate) fn begin(registry: Option<Arc<MetricsRegistry>>) -> Self {
        let mut snapshot = registry
            .as_ref()
            .map(|r| r.snapshot())
            .unwrap_or_default();
        snapshot.sessions += 1;
        snapshot.session_active = true;
        snapshot.consecutive_hits = 0;
        let stats = Self { registry, snapshot };
        stats.publish();
        stats
    }

    pub(crate) fn attempt(&mut self) {
        self.snapshot.attempts += 1;
    }

    pub(crate) fn miss(&mut self) {
        self.snapshot.decode_misses += 1;
        self.publish();
    }

    pub(crate) fn observed(&mut self, valid: bool, consecutive_hits: u32) {
        if !valid {
            self.snapshot.invalid_candidates += 1;
        }
        self.snapshot.consecutive_hits = consecutive_hits;
        self.publish();
    }

    pub(crate) fn confirmed(&mut self) {
        self.snapshot.confirmations += 1;
        self.publish();
    }

    pub(crate) fn device_error(&mut self) {
        self.snapshot.device_errors += 1;
        self.publish();
    }

    fn publish(&self) {
        if let Some(registry) = &self.registry {
            registry.update(&self.snapshot);
        }
    }
}

impl Drop for SessionStats {
    fn drop(&mut self) {
        self.snapshot.session_active = false;
        self.snapshot.consecutive_hits = 0;
        self.publish();
    }
}
