use crate::detector::PoseDetector;
use crate::error::{PipelineError, Result};
use crate::frame::FrameData;
use crate::motion::{DisplacementComputer, MotionAggregator, MotionReport};
use crate::pose::{KeypointFrame, Skeleton};
use crate::render::{FrameLabeler, SkeletonRenderer};
use crate::video::{VideoSink, VideoSource};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Lifecycle of a single `analyze` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Init,
    Streaming,
    Done,
    Failed,
}

/// Sequential frame pipeline: decode, detect, aggregate, render, encode
pub struct AnalysisPipeline {
    skeleton: Arc<Skeleton>,
    renderer: SkeletonRenderer,
    labeler: Option<FrameLabeler>,
    detector: Box<dyn PoseDetector>,
    max_frames: Option<u64>,
    state: PipelineState,
}

impl AnalysisPipeline {
    pub(crate) fn from_parts(
        skeleton: Arc<Skeleton>,
        renderer: SkeletonRenderer,
        labeler: Option<FrameLabeler>,
        detector: Box<dyn PoseDetector>,
        max_frames: Option<u64>,
    ) -> Self {
        Self {
            skeleton,
            renderer,
            labeler,
            detector,
            max_frames,
            state: PipelineState::Init,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Analyze every frame of `source`, writing the overlay video to `sink`.
    ///
    /// The sink is closed on every exit path. A report is only returned after a clean
    /// end of stream; source and sink failures abort the run with the failing frame index.
    pub fn analyze<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<MotionReport>
    where
        S: VideoSource + ?Sized,
        K: VideoSink + ?Sized,
    {
        self.state = PipelineState::Init;
        let started = Instant::now();

        let mut aggregator =
            MotionAggregator::new(DisplacementComputer::new(Arc::clone(&self.skeleton)));

        let total = match (source.frame_count_hint(), self.max_frames) {
            (Some(count), Some(max)) => Some(count.min(max)),
            (count, _) => count,
        };

        info!(
            "Starting analysis with {} detector (frames: {:?}, max_frames: {:?})",
            self.detector.name(),
            total,
            self.max_frames
        );

        self.state = PipelineState::Streaming;
        let streamed = self.stream(source, sink, &mut aggregator, total);

        let frames_written = match streamed {
            Ok(frames_written) => frames_written,
            Err(e) => {
                self.state = PipelineState::Failed;
                if let Err(close_err) = sink.close() {
                    warn!("Failed to close sink after error: {}", close_err);
                }
                error!(
                    "Analysis aborted after {} frames: {}",
                    aggregator.frames_processed(),
                    e
                );
                return Err(e.into());
            }
        };

        if let Err(e) = sink.close() {
            self.state = PipelineState::Failed;
            error!("Failed to finalize output: {}", e);
            return Err(PipelineError::SinkClose {
                frames_written,
                source: e,
            }
            .into());
        }

        self.state = PipelineState::Done;
        let totals = aggregator.side_totals();
        debug!(
            "Side totals over {} pairs: left {:.5}, right {:.5}",
            aggregator.pairs_with_intensity(),
            totals.left,
            totals.right
        );
        let report = aggregator.finalize();

        info!(
            "Analysis complete in {:.2}s: {} frames, {} with pose, intensity {:.5}, dominant {}",
            started.elapsed().as_secs_f64(),
            report.frames_processed,
            report.frames_with_pose,
            report.avg_movement_intensity,
            report.dominant_limb
        );

        Ok(report)
    }

    fn stream<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
        aggregator: &mut MotionAggregator,
        total: Option<u64>,
    ) -> std::result::Result<u64, PipelineError>
    where
        S: VideoSource + ?Sized,
        K: VideoSink + ?Sized,
    {
        let mut frames_written = 0u64;

        loop {
            let position = aggregator.frames_processed();
            if self.max_frames.is_some_and(|max| position >= max) {
                info!("Reached max_frames limit of {}", position);
                break;
            }

            let mut frame = match source.next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    debug!("End of stream after {} frames", position);
                    break;
                }
                Err(e) => {
                    return Err(PipelineError::SourceRead {
                        frame_index: position,
                        source: e,
                    })
                }
            };

            let keypoints = self.detect(&frame);

            self.renderer.render(&mut frame.image, &keypoints);
            if let Some(labeler) = &self.labeler {
                labeler.draw(&mut frame.image, position, total);
            }

            debug!(
                "Frame {}: pose={} joints={}",
                frame.index,
                keypoints.pose_detected(),
                keypoints.joint_count()
            );
            aggregator.update(keypoints);

            sink.write_frame(&frame)
                .map_err(|e| PipelineError::SinkWrite {
                    frame_index: frame.index,
                    source: e,
                })?;
            frames_written += 1;
        }

        Ok(frames_written)
    }

    /// Run the detector, downgrading failures to "no pose" for this frame
    fn detect(&mut self, frame: &FrameData) -> KeypointFrame {
        match self.detector.detect(frame) {
            Ok(detection) => KeypointFrame::from_detection(frame.index, detection, &self.skeleton),
            Err(e) => {
                warn!(
                    "Detection failed for frame {}, treating as no pose: {}",
                    frame.index, e
                );
                KeypointFrame::undetected(frame.index)
            }
        }
    }
}
