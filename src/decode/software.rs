//! Software fallback: self-sampling decoder over the full raw frame.

use super::{ean13, DecodeCandidate, DecodeError, FrameDecoder};
use crate::capture::{Frame, BYTES_PER_PIXEL};
use crate::conditioning::luma;

/// Rows below this luma spread are treated as featureless.
const MIN_ROW_CONTRAST: u8 = 40;

/// Decodes EAN-13 from raw frames without the conditioning step.
///
/// Samples rows spread over the middle 80% of the frame height and
/// binarizes each row against its own mean luma, which tolerates
/// lighting gradients across the picture.
#[derive(Debug, Clone)]
pub struct SampledDecoder {
    rows: u32,
}

impl SampledDecoder {
    /// Creates a decoder sampling `rows` rows per attempt.
    pub fn new(rows: u32) -> Self {
        Self { rows: rows.max(1) }
    }

    fn sample_rows(&self, height: u32) -> impl Iterator<Item = u32> {
        let top = height / 10;
        let span = height - 2 * top;
        let count = self.rows;
        (0..count).map(move |i| top + span * (2 * i + 1) / (2 * count))
    }
}

impl Default for SampledDecoder {
    fn default() -> Self {
        Self::new(15)
    }
}

/// Binarizes one RGBA row against its mean luma.
fn binarize_row(row: &[u8]) -> Option<Vec<bool>> {
    let lumas: Vec<u8> = row
        .chunks_exact(BYTES_PER_PIXEL)
        .map(|p| luma(p[0], p[1], p[2]))
        .collect();
    let min = lumas.iter().copied().min()?;
    let max = lumas.iter().copied().max()?;
    if max - min < MIN_ROW_CONTRAST {
        return None;
    }
    let mean = lumas.iter().map(|&l| u32::from(l)).sum::<u32>() / lumas.len() as u32;
    Some(lumas.iter().map(|&l| u32::from(l) <= mean).collect())
}

impl FrameDecoder for SampledDecoder {
    fn decode_once(&mut self, frame: &Frame) -> Result<DecodeCandidate, DecodeError> {
        if !frame.is_valid() {
            return Err(DecodeError::Failed(format!(
                "{} pixel bytes for a {}x{} frame",
                frame.pixels().len(),
                frame.width(),
                frame.height()
            )));
        }
        if frame.width() == 0 || frame.height() == 0 {
            return Err(DecodeError::NotFound);
        }
        self.sample_rows(frame.height())
            .filter_map(|y| frame.row(y))
            .filter_map(binarize_row)
            .find_map(|row| ean13::decode_row(&row))
            .map(|code| DecodeCandidate::from_raw(&code))
            .ok_or(DecodeError::NotFound)
    }
}
