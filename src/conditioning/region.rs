//! Region of interest within a frame.

use serde::{Deserialize, Serialize};

/// Crop region expressed in whole percent of the source frame.
///
/// The default is a centre-lower horizontal band (10%–90% width,
/// 55%–85% height), where a book's barcode usually sits when the cover
/// is filmed upright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropRegion {
    /// Left edge, percent of width.
    pub left_pct: u32,
    /// Top edge, percent of height.
    pub top_pct: u32,
    /// Width, percent of width.
    pub width_pct: u32,
    /// Height, percent of height.
    pub height_pct: u32,
}

impl Default for CropRegion {
    fn default() -> Self {
        Self {
            left_pct: 10,
            top_pct: 55,
            width_pct: 80,
            height_pct: 30,
        }
    }
}

/// A pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CropRegion {
    /// Returns true if the region is non-empty and lies inside the frame.
    pub fn is_valid(&self) -> bool {
        self.width_pct > 0
            && self.height_pct > 0
            && self.left_pct + self.width_pct <= 100
            && self.top_pct + self.height_pct <= 100
    }

    /// Resolves the region against a frame size, rounding down.
    pub fn resolve(&self, frame_width: u32, frame_height: u32) -> Rect {
        let scale = |total: u32, pct: u32| (u64::from(total) * u64::from(pct) / 100) as u32;
        let x = scale(frame_width, self.left_pct).min(frame_width);
        let y = scale(frame_height, self.top_pct).min(frame_height);
        Rect {
            x,
            y,
            width: scale(frame_width, self.width_pct).min(frame_width - x),
            height: scale(frame_height, self.height_pct).min(frame_height - y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_band_bounds() {
        let rect = CropRegion::default().resolve(1000, 800);
        assert_eq!(
            rect,
            Rect {
                x: 100,
                y: 440,
                width: 800,
                height: 240
            }
        );
    }

    #[test]
    fn test_resolve_rounds_down() {
        let rect = CropRegion::default().resolve(1279, 719);
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (127, 395, 1023, 215));
    }

    #[test]
    fn test_resolve_empty_frame() {
        let rect = CropRegion::default().resolve(0, 0);
        assert_eq!((rect.width, rect.height), (0, 0));
    }

    #[test]
    fn test_validity() {
        assert!(CropRegion::default().is_valid());
        let oversized = CropRegion {
            left_pct: 30,
            width_pct: 80,
            ..CropRegion::default()
        };
        assert!(!oversized.is_valid());
    }
}
