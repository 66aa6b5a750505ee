use std::time::Duration;

use ndarray::ArrayView3;

/// Bytes per pixel: frames are always packed RGB24.
pub const CHANNELS: usize = 3;

/// One captured video frame: packed RGB24, row-major.
///
/// Capture backends convert to RGB at the boundary; everything past the
/// frame source treats the pixels as opaque and only reads them.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    index: usize,
    timestamp: Duration,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * CHANNELS,
            "data length must equal width * height * 3"
        );
        Self {
            data,
            width,
            height,
            index,
            timestamp: Duration::ZERO,
        }
    }

    /// Presentation time relative to the start of capture.
    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// `(height, width, channel)` view used by inference preprocessing.
    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(
            (self.height as usize, self.width as usize, CHANNELS),
            &self.data,
        )
        .expect("Frame data length must match dimensions")
    }

    /// Copies the pixels into an `image` buffer for compositing.
    pub fn to_rgb_image(&self) -> Option<image::RgbImage> {
        image::RgbImage::from_raw(self.width, self.height, self.data.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2 RGB
        let frame = Frame::new(data.clone(), 2, 2, 7);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.index(), 7);
        assert_eq!(frame.timestamp(), Duration::ZERO);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    fn test_with_timestamp() {
        let frame = Frame::new(vec![0u8; 3], 1, 1, 0).with_timestamp(Duration::from_millis(40));
        assert_eq!(frame.timestamp(), Duration::from_millis(40));
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * 3")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 0);
    }

    #[test]
    fn test_as_ndarray_is_height_major() {
        // 2 rows x 4 columns: set pixel (row=1, col=3) green
        let mut data = vec![0u8; 24];
        data[(4 + 3) * 3 + 1] = 200;
        let frame = Frame::new(data, 4, 2, 0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]);
        assert_eq!(arr[[1, 3, 1]], 200);
        assert_eq!(arr[[1, 3, 0]], 0);
    }

    #[test]
    fn test_to_rgb_image_matches_pixels() {
        let data = vec![10, 20, 30, 40, 50, 60];
        let frame = Frame::new(data, 2, 1, 0);
        let img = frame.to_rgb_image().unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [40, 50, 60]);
    }
}
