mod keypoint_track;

use crate::error::DetectionError;
use crate::frame::FrameData;
use crate::pose::Detection;

pub use keypoint_track::KeypointTrackDetector;

/// Single-person body landmark detector.
///
/// Returning an empty [`Detection`] means "no pose in this frame" and is not an error;
/// `Err` is reserved for inputs the detector cannot process at all.
pub trait PoseDetector: Send {
    fn detect(&mut self, frame: &FrameData) -> Result<Detection, DetectionError>;

    /// Short name used in logs
    fn name(&self) -> &str {
        "detector"
    }
}

impl<D: PoseDetector + ?Sized> PoseDetector for Box<D> {
    fn detect(&mut self, frame: &FrameData) -> Result<Detection, DetectionError> {
        (**self).detect(frame)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
