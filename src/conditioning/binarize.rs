//! Luma thresholding.

/// Luma scaled by 1000: `299 R + 587 G + 114 B`.
///
/// Integer weights keep the threshold comparison exact.
#[inline]
pub fn luma_milli(r: u8, g: u8, b: u8) -> u32 {
    299 * u32::from(r) + 587 * u32::from(g) + 114 * u32::from(b)
}

/// Luma rounded down to the 0–255 range.
#[inline]
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    (luma_milli(r, g, b) / 1000) as u8
}

/// Returns true if the pixel is brighter than `threshold`.
///
/// The boundary is exclusive: luma equal to the threshold is dark.
#[inline]
pub fn is_light(r: u8, g: u8, b: u8, threshold: u8) -> bool {
    luma_milli(r, g, b) > u32::from(threshold) * 1000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gray_luma_is_exact() {
        for v in 0..=255u8 {
            assert_eq!(luma(v, v, v), v);
        }
    }

    #[test]
    fn test_threshold_boundary_exclusive() {
        assert!(is_light(161, 161, 161, 160));
        assert!(!is_light(160, 160, 160, 160));
    }

    #[test]
    fn test_channel_weights() {
        // Pure green is much brighter than pure blue.
        assert_eq!(luma(0, 255, 0), 149);
        assert_eq!(luma(0, 0, 255), 29);
        assert!(!is_light(255, 0, 0, 160));
    }
}
