//! Frame conditioning.
//!
//! Crops the barcode band out of a raw frame and binarizes it. Decoders
//! are sensitive to contrast; a hard luma threshold removes mid-tone noise
//! from glare and uneven lighting while keeping the bar/space structure.

mod binarize;
mod region;

pub use binarize::{is_light, luma, luma_milli};
pub use region::{CropRegion, Rect};

use crate::capture::{Frame, BYTES_PER_PIXEL};
use crate::config::ConditioningConfig;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

/// A binarized crop of a raw frame.
///
/// Every pixel is pure white or pure black (alpha stays opaque). The
/// dimensions always equal the crop rectangle resolved against the source.
#[derive(Clone)]
pub struct ConditionedFrame {
    pixels: Vec<u8>,
    source: Rect,
    sequence: u64,
}

impl ConditionedFrame {
    /// Crop width.
    pub fn width(&self) -> u32 {
        self.source.width
    }

    /// Crop height.
    pub fn height(&self) -> u32 {
        self.source.height
    }

    /// Rectangle of the source frame this crop covers.
    pub fn source_rect(&self) -> Rect {
        self.source
    }

    /// Sequence number of the source frame.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// RGBA pixel data.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// RGBA value at `(x, y)` in crop coordinates.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let offset = ((y as usize) * (self.width() as usize) + x as usize) * BYTES_PER_PIXEL;
        self.pixels
            .get(offset..offset + BYTES_PER_PIXEL)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// One row as dark (`true`) / light (`false`) modules.
    pub fn dark_row(&self, y: u32) -> Option<Vec<bool>> {
        if y >= self.height() {
            return None;
        }
        let stride = self.width() as usize * BYTES_PER_PIXEL;
        let start = y as usize * stride;
        self.pixels
            .get(start..start + stride)
            .map(|row| row.chunks_exact(BYTES_PER_PIXEL).map(|p| p[0] == 0).collect())
    }
}

impl std::fmt::Debug for ConditionedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConditionedFrame")
            .field("source", &self.source)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Extracts the barcode band and applies the luma threshold.
#[derive(Debug, Clone)]
pub struct FrameConditioner {
    region: CropRegion,
    threshold: u8,
}

impl FrameConditioner {
    /// Creates a conditioner for a region and threshold.
    pub fn new(region: CropRegion, threshold: u8) -> Self {
        Self { region, threshold }
    }

    /// Creates a conditioner from configuration.
    pub fn from_config(config: &ConditioningConfig) -> Self {
        Self::new(config.crop, config.luma_threshold)
    }

    /// Crop region in use.
    pub fn region(&self) -> CropRegion {
        self.region
    }

    /// Crops and binarizes `frame`.
    pub fn condition(&self, frame: &Frame) -> ConditionedFrame {
        let rect = self.region.resolve(frame.width(), frame.height());
        let mut pixels = Vec::with_capacity(rect.width as usize * rect.height as usize * BYTES_PER_PIXEL);

        for y in rect.y..rect.y + rect.height {
            let Some(row) = frame.row(y) else {
                break;
            };
            let start = rect.x as usize * BYTES_PER_PIXEL;
            let end = (rect.x + rect.width) as usize * BYTES_PER_PIXEL;
            for p in row[start..end].chunks_exact(BYTES_PER_PIXEL) {
                let out = if is_light(p[0], p[1], p[2], self.threshold) {
                    WHITE
                } else {
                    BLACK
                };
                pixels.extend_from_slice(&out);
            }
        }

        // A short pixel buffer would break the size invariant; pad with black.
        pixels.resize(rect.width as usize * rect.height as usize * BYTES_PER_PIXEL, 0);

        ConditionedFrame {
            pixels,
            source: rect,
            sequence: frame.sequence(),
        }
    }
}

impl Default for FrameConditioner {
    fn default() -> Self {
        Self::from_config(&ConditioningConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crop_dimensions() {
        let frame = Frame::filled(1000, 800, [255, 255, 255, 255]);
        let conditioned = FrameConditioner::default().condition(&frame);

        assert_eq!(conditioned.width(), 800);
        assert_eq!(conditioned.height(), 240);
        let rect = conditioned.source_rect();
        assert_eq!((rect.x, rect.y), (100, 440));
        assert_eq!(conditioned.pixels().len(), 800 * 240 * 4);
    }

    #[test]
    fn test_threshold_boundary() {
        let conditioner = FrameConditioner::default();

        let light = conditioner.condition(&Frame::filled(10, 10, [161, 161, 161, 255]));
        assert_eq!(light.pixel(0, 0), Some([255, 255, 255, 255]));

        let dark = conditioner.condition(&Frame::filled(10, 10, [160, 160, 160, 255]));
        assert_eq!(dark.pixel(0, 0), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_binarization_is_local() {
        // Left half bright, right half dim: each side keeps its own value.
        let mut frame = Frame::filled(20, 20, [90, 90, 90, 255]);
        let pixels = frame.prepare(20, 20, 3);
        for (i, p) in pixels.chunks_exact_mut(4).enumerate() {
            let v = if i % 20 < 10 { 220 } else { 90 };
            p.copy_from_slice(&[v, v, v, 255]);
        }

        let conditioned = FrameConditioner::default().condition(&frame);
        let row = conditioned.dark_row(0).unwrap();

        // Crop starts at x=2; columns 2..10 are light, 10..18 dark.
        assert_eq!(row.len(), 16);
        assert!(row[..8].iter().all(|d| !d));
        assert!(row[8..].iter().all(|d| *d));
        assert_eq!(conditioned.sequence(), 3);
    }

    #[test]
    fn test_empty_frame() {
        let conditioned = FrameConditioner::default().condition(&Frame::empty());
        assert_eq!((conditioned.width(), conditioned.height()), (0, 0));
        assert!(conditioned.pixels().is_empty());
        assert!(conditioned.dark_row(0).is_none());
    }
}
