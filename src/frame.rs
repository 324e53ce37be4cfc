use image::RgbImage;
use std::time::Duration;

/// Decoded video frame
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Zero-based position in the source stream
    pub index: u64,
    /// Presentation timestamp relative to the start of the stream
    pub timestamp: Duration,
    /// Pixel data
    pub image: RgbImage,
}

impl FrameData {
    /// Create a new frame
    pub fn new(index: u64, timestamp: Duration, image: RgbImage) -> Self {
        Self {
            index,
            timestamp,
            image,
        }
    }

    /// Create a frame with its timestamp derived from a nominal frame rate
    pub fn at_rate(index: u64, fps: f64, image: RgbImage) -> Self {
        let timestamp = if fps > 0.0 {
            Duration::from_secs_f64(index as f64 / fps)
        } else {
            Duration::ZERO
        };
        Self::new(index, timestamp, image)
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Size of the raw RGB24 payload in bytes
    pub fn byte_len(&self) -> usize {
        self.image.as_raw().len()
    }
}
