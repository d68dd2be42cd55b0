//! Grayscale frame type and pixel accessors

use crate::FrameError;
use image::GrayImage;

/// Single-channel 8-bit video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Luminance pixel data (width * height)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (microseconds, monotonic)
    pub timestamp_us: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new frame from raw grayscale data
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_us: u64,
        sequence: u32,
    ) -> Result<Self, FrameError> {
        if data.len() != (width * height) as usize {
            return Err(FrameError::Geometry {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp_us,
            sequence,
        })
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<u8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.data[(y * self.width + x) as usize])
    }

    /// Mean luminance over the whole frame
    pub fn mean_brightness(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.data.iter().map(|&p| p as u64).sum();
        sum as f32 / self.data.len() as f32
    }

    /// Crop a region of the frame
    pub fn crop(&self, x: u32, y: u32, w: u32, h: u32) -> Option<VideoFrame> {
        if w == 0 || h == 0 || x + w > self.width || y + h > self.height {
            return None;
        }

        let mut cropped = Vec::with_capacity((w * h) as usize);
        for row in y..(y + h) {
            let start = (row * self.width + x) as usize;
            let end = start + w as usize;
            cropped.extend_from_slice(&self.data[start..end]);
        }

        Some(VideoFrame {
            data: cropped,
            width: w,
            height: h,
            timestamp_us: self.timestamp_us,
            sequence: self.sequence,
        })
    }

    /// View the frame as an owned `image::GrayImage`
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_raw(self.width, self.height, self.data.clone())
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Build a frame from a `GrayImage`
    pub fn from_gray_image(img: &GrayImage, timestamp_us: u64, sequence: u32) -> Self {
        Self {
            data: img.as_raw().clone(),
            width: img.width(),
            height: img.height(),
            timestamp_us,
            sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform_frame(width: u32, height: u32, value: u8) -> VideoFrame {
        VideoFrame::new(vec![value; (width * height) as usize], width, height, 0, 0)
            .expect("valid geometry")
    }

    #[test]
    fn test_geometry_validation() {
        let result = VideoFrame::new(vec![0u8; 10], 4, 4, 0, 0);
        assert!(matches!(result, Err(FrameError::Geometry { .. })));
    }

    #[test]
    fn test_pixel_access() {
        let mut frame = uniform_frame(8, 4, 10);
        frame.data[8 * 2 + 3] = 99;

        assert_eq!(frame.get_pixel(3, 2), Some(99));
        assert_eq!(frame.get_pixel(0, 0), Some(10));
        assert_eq!(frame.get_pixel(8, 0), None);
    }

    #[test]
    fn test_crop_bounds() {
        let frame = uniform_frame(16, 16, 50);

        let inside = frame.crop(4, 4, 8, 8).expect("in-bounds crop");
        assert_eq!(inside.width, 8);
        assert_eq!(inside.height, 8);
        assert_eq!(inside.data.len(), 64);

        assert!(frame.crop(12, 0, 8, 4).is_none());
        assert!(frame.crop(0, 0, 0, 4).is_none());
    }

    #[test]
    fn test_mean_brightness() {
        let frame = uniform_frame(4, 4, 100);
        assert!((frame.mean_brightness() - 100.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_gray_image_round_trip() {
        let mut frame = uniform_frame(6, 3, 0);
        for (i, px) in frame.data.iter_mut().enumerate() {
            *px = i as u8;
        }

        let img = frame.to_gray_image();
        let back = VideoFrame::from_gray_image(&img, frame.timestamp_us, frame.sequence);
        assert_eq!(back.data, frame.data);
    }
}
