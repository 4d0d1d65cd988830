//! Native fast path: EAN-13 scanlines over the conditioned band.

use super::{ean13, BarcodeDetector, DecodeCandidate};
use crate::conditioning::ConditionedFrame;

/// Reads EAN-13 symbols along evenly spaced rows of a binarized crop.
///
/// Rows are visited from the centre of the band outwards, so the most
/// likely row is tried first. Each distinct payload is reported once.
#[derive(Debug, Clone)]
pub struct ScanlineDetector {
    rows: u32,
}

impl ScanlineDetector {
    /// Creates a detector that samples up to `rows` rows per frame.
    pub fn new(rows: u32) -> Self {
        Self { rows: rows.max(1) }
    }

    /// Row indices to scan, centre first.
    fn scan_rows(&self, height: u32) -> Vec<u32> {
        if height == 0 {
            return Vec::new();
        }
        let count = self.rows.min(height);
        let step = height / (count + 1);
        let mut rows: Vec<u32> = (1..=count).map(|i| (i * step).min(height - 1)).collect();
        let centre = height / 2;
        rows.sort_by_key(|&y| y.abs_diff(centre));
        rows.dedup();
        rows
    }
}

impl Default for ScanlineDetector {
    fn default() -> Self {
        Self::new(9)
    }
}

impl BarcodeDetector for ScanlineDetector {
    fn detect(&mut self, frame: &ConditionedFrame) -> Vec<DecodeCandidate> {
        let mut found: Vec<DecodeCandidate> = Vec::new();
        for y in self.scan_rows(frame.height()) {
            let Some(row) = frame.dark_row(y) else {
                continue;
            };
            if let Some(code) = ean13::decode_row(&row) {
                let candidate = DecodeCandidate::from_raw(&code);
                if !found.contains(&candidate) {
                    tracing::trace!(row = y, code = %code, "Scanline decoded");
                    found.push(candidate);
                }
            }
        }
        found
    }
}
