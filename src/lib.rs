pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod motion;
pub mod pipeline;
pub mod pose;
pub mod render;
pub mod session;
pub mod video;

pub use config::DancecamConfig;
pub use detector::{KeypointTrackDetector, PoseDetector};
pub use error::{DancecamError, Result};
pub use frame::FrameData;
pub use motion::{DisplacementComputer, DominantLimb, MotionAggregator, MotionReport};
pub use pipeline::{AnalysisPipeline, AnalysisPipelineBuilder, PipelineState};
pub use pose::{Detection, Joint, Keypoint, KeypointFrame, Skeleton};
pub use render::{FrameLabeler, SkeletonRenderer};
pub use session::{AnalysisMetadata, AnalysisRequest, AnalysisSession, InputKind};
pub use video::{ImageSequenceSink, ImageSequenceSource, VideoSink, VideoSource};

#[cfg(all(feature = "video", target_os = "linux"))]
pub use video::{GstVideoSink, GstVideoSource};
