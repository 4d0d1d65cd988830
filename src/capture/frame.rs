//! Frame type representing a captured RGBA image with metadata.

use std::time::Instant;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// A single captured frame from the camera.
///
/// Pixels are tightly packed RGBA, row-major. The session owns one
/// `Frame` as its working buffer and hands it to the stream for every
/// capture, so the allocation is reused across decode attempts.
#[derive(Clone)]
pub struct Frame {
    /// Raw RGBA pixel data.
    pixels: Vec<u8>,
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Capture timestamp.
    timestamp: Instant,
    /// Monotonic sequence number.
    sequence: u64,
}

impl Frame {
    /// Creates a new frame with the given parameters.
    pub fn new(pixels: Vec<u8>, width: u32, height: u32, sequence: u64) -> Self {
        Self {
            pixels,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        }
    }

    /// Creates an empty working buffer with no pixels.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, 0, 0)
    }

    /// Creates a frame filled with a single RGBA color.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let count = (width as usize) * (height as usize);
        let mut pixels = Vec::with_capacity(count * BYTES_PER_PIXEL);
        for _ in 0..count {
            pixels.extend_from_slice(&rgba);
        }
        Self::new(pixels, width, height, 0)
    }

    /// Resizes the buffer for a new capture and returns the pixel storage
    /// to be overwritten by the stream.
    ///
    /// Existing capacity is kept, so repeated captures at the same size do
    /// not allocate.
    pub fn prepare(&mut self, width: u32, height: u32, sequence: u64) -> &mut [u8] {
        let len = (width as usize) * (height as usize) * BYTES_PER_PIXEL;
        self.pixels.resize(len, 0);
        self.width = width;
        self.height = height;
        self.sequence = sequence;
        self.timestamp = Instant::now();
        &mut self.pixels
    }

    /// Returns a reference to the raw RGBA pixel data.
    #[inline]
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns the frame width.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Returns the frame height.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Returns the capture timestamp.
    #[inline]
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Returns the sequence number.
    #[inline]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the total number of pixels (width * height).
    #[inline]
    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Returns the RGBA value at `(x, y)`, or `None` outside the frame.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + x as usize) * BYTES_PER_PIXEL;
        self.pixels
            .get(offset..offset + BYTES_PER_PIXEL)
            .map(|p| [p[0], p[1], p[2], p[3]])
    }

    /// Returns one row of RGBA bytes.
    pub fn row(&self, y: u32) -> Option<&[u8]> {
        if y >= self.height {
            return None;
        }
        let stride = (self.width as usize) * BYTES_PER_PIXEL;
        let start = (y as usize) * stride;
        self.pixels.get(start..start + stride)
    }

    /// Validates that the pixel buffer size matches dimensions.
    pub fn is_valid(&self) -> bool {
        self.pixels.len() == self.pixel_count() * BYTES_PER_PIXEL
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("pixel_bytes", &self.pixels.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_creation() {
        let pixels = vec![0u8; 640 * 480 * 4];
        let frame = Frame::new(pixels, 640, 480, 1);

        assert_eq!(frame.width(), 640);
        assert_eq!(frame.height(), 480);
        assert_eq!(frame.sequence(), 1);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_frame_invalid_size() {
        let pixels = vec![0u8; 100]; // Wrong size
        let frame = Frame::new(pixels, 640, 480, 1);

        assert!(!frame.is_valid());
    }

    #[test]
    fn test_prepare_reuses_buffer() {
        let mut frame = Frame::empty();
        frame.prepare(16, 8, 1).fill(7);
        assert!(frame.is_valid());
        assert_eq!(frame.pixel(15, 7), Some([7, 7, 7, 7]));

        frame.prepare(4, 2, 2);
        assert!(frame.is_valid());
        assert_eq!(frame.sequence(), 2);
        assert_eq!(frame.pixel(4, 0), None);
    }

    #[test]
    fn test_row_access() {
        let frame = Frame::filled(3, 2, [1, 2, 3, 255]);
        let row = frame.row(1).unwrap();
        assert_eq!(row.len(), 12);
        assert_eq!(&row[..4], &[1, 2, 3, 255]);
        assert!(frame.row(2).is_none());
    }
}
