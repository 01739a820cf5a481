//! Decoded video frame representation
//!
//! Frames are stored as tightly packed, top-down, 8-bit RGB.

use super::PipelineError;

/// Bytes per RGB pixel
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// A decoded RGB video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// Packed RGB pixel data, rows top to bottom
    pub data: Vec<u8>,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Sequence number assigned by the mailbox on publish
    pub sequence: u64,
}

impl VideoFrame {
    /// Create a frame from already packed top-down RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self, PipelineError> {
        let expected = Self::expected_size(width, height);
        if data.len() != expected {
            return Err(PipelineError::InvalidFrame(format!(
                "{}x{} RGB needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            sequence: 0,
        })
    }

    /// Copy a frame out of a mapped pipeline plane
    ///
    /// `pitch` is the row stride in bytes. Rows may be padded beyond
    /// `width * 3`; a negative pitch means rows are stored bottom-up.
    pub fn from_rgb_plane(
        width: u32,
        height: u32,
        pitch: i32,
        plane: &[u8],
    ) -> Result<Self, PipelineError> {
        let row_bytes = width as usize * RGB_BYTES_PER_PIXEL;
        let stride = pitch.unsigned_abs() as usize;

        if stride < row_bytes {
            return Err(PipelineError::InvalidFrame(format!(
                "stride {} shorter than row of {} bytes",
                stride, row_bytes
            )));
        }

        let rows = height as usize;
        let needed = if rows == 0 { 0 } else { stride * (rows - 1) + row_bytes };
        if plane.len() < needed {
            return Err(PipelineError::InvalidFrame(format!(
                "plane holds {} bytes, {}x{} with stride {} needs {}",
                plane.len(),
                width,
                height,
                stride,
                needed
            )));
        }

        let mut data = Vec::with_capacity(row_bytes * rows);
        for row in 0..rows {
            let src_row = if pitch < 0 { rows - 1 - row } else { row };
            let start = src_row * stride;
            data.extend_from_slice(&plane[start..start + row_bytes]);
        }

        Self::new(data, width, height)
    }

    /// Expected packed RGB size for the given dimensions
    pub fn expected_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * RGB_BYTES_PER_PIXEL
    }

    /// Bytes per row
    pub fn stride(&self) -> usize {
        self.width as usize * RGB_BYTES_PER_PIXEL
    }

    /// Expand to RGBA for texture upload (GPUs have no packed RGB8 format)
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for pixel in self.data.chunks_exact(RGB_BYTES_PER_PIXEL) {
            rgba.extend_from_slice(pixel);
            rgba.push(255);
        }
        rgba
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 2x2 frame: row 0 red/green, row 1 blue/white
    fn rows() -> [[u8; 6]; 2] {
        [[255, 0, 0, 0, 255, 0], [0, 0, 255, 255, 255, 255]]
    }

    #[test]
    fn test_packed_plane_is_copied() {
        let plane: Vec<u8> = rows().concat();
        let frame = VideoFrame::from_rgb_plane(2, 2, 6, &plane).unwrap();
        assert_eq!(frame.data, plane);
        assert_eq!(frame.stride(), 6);
    }

    #[test]
    fn test_row_padding_is_stripped() {
        let [top, bottom] = rows();
        let mut plane = Vec::new();
        plane.extend_from_slice(&top);
        plane.extend_from_slice(&[9, 9]);
        plane.extend_from_slice(&bottom);
        plane.extend_from_slice(&[9, 9]);

        let frame = VideoFrame::from_rgb_plane(2, 2, 8, &plane).unwrap();
        assert_eq!(frame.data, rows().concat());
    }

    #[test]
    fn test_negative_pitch_flips_rows() {
        let [top, bottom] = rows();
        let bottom_up: Vec<u8> = [bottom, top].concat();

        let frame = VideoFrame::from_rgb_plane(2, 2, -6, &bottom_up).unwrap();
        assert_eq!(frame.data, rows().concat());
    }

    #[test]
    fn test_short_plane_is_rejected() {
        let result = VideoFrame::from_rgb_plane(2, 2, 6, &[0u8; 8]);
        assert!(matches!(result, Err(PipelineError::InvalidFrame(_))));

        let result = VideoFrame::from_rgb_plane(4, 1, 6, &[0u8; 12]);
        assert!(matches!(result, Err(PipelineError::InvalidFrame(_))));
    }

    #[test]
    fn test_rgba_expansion() {
        let frame = VideoFrame::new(rows().concat(), 2, 2).unwrap();
        let rgba = frame.to_rgba();
        assert_eq!(rgba.len(), 16);
        assert_eq!(&rgba[0..4], &[255, 0, 0, 255]);
        assert_eq!(&rgba[12..16], &[255, 255, 255, 255]);
    }
}
