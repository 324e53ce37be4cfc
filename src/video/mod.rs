//! Video sources and sinks consumed by the analysis pipeline.
//!
//! Sources are single-pass: each call to [`VideoSource::next_frame`] decodes one frame,
//! `Ok(None)` marks a clean end of stream and `Err` a read failure.

mod image_seq;

#[cfg(all(feature = "video", target_os = "linux"))]
mod gst;

use crate::error::VideoError;
use crate::frame::FrameData;

pub use image_seq::{ImageSequenceSink, ImageSequenceSource};

#[cfg(all(feature = "video", target_os = "linux"))]
pub use gst::{GstVideoSink, GstVideoSource};

/// File extensions accepted as encoded video input
pub const VIDEO_EXTENSIONS: [&str; 5] = ["mp4", "mov", "avi", "mkv", "webm"];

/// Sequential pull interface over decoded frames
pub trait VideoSource {
    /// Next frame, or `Ok(None)` at end of stream
    fn next_frame(&mut self) -> Result<Option<FrameData>, VideoError>;

    /// Nominal frame rate, if known
    fn frame_rate(&self) -> Option<f64> {
        None
    }

    /// Total number of frames, if known up front
    fn frame_count_hint(&self) -> Option<u64> {
        None
    }
}

/// Sequential push interface for rendered frames
pub trait VideoSink {
    fn write_frame(&mut self, frame: &FrameData) -> Result<(), VideoError>;

    /// Flush and release the sink. Called once, on success and on failure.
    fn close(&mut self) -> Result<(), VideoError>;
}

impl<S: VideoSource + ?Sized> VideoSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<FrameData>, VideoError> {
        (**self).next_frame()
    }

    fn frame_rate(&self) -> Option<f64> {
        (**self).frame_rate()
    }

    fn frame_count_hint(&self) -> Option<u64> {
        (**self).frame_count_hint()
    }
}

impl<S: VideoSink + ?Sized> VideoSink for Box<S> {
    fn write_frame(&mut self, frame: &FrameData) -> Result<(), VideoError> {
        (**self).write_frame(frame)
    }

    fn close(&mut self) -> Result<(), VideoError> {
        (**self).close()
    }
}

/// Whether a path names an encoded video container we accept
pub fn is_video_file(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
