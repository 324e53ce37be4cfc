use crate::motion::displacement::DisplacementComputer;
use crate::pose::{KeypointFrame, Side};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{trace, warn};

/// Side with the greater accumulated movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DominantLimb {
    Left,
    Right,
    /// Equal totals, including videos without any measurable motion
    Balanced,
}

impl fmt::Display for DominantLimb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DominantLimb::Left => f.write_str("left"),
            DominantLimb::Right => f.write_str("right"),
            DominantLimb::Balanced => f.write_str("balanced"),
        }
    }
}

/// Final movement metrics of one analysis run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionReport {
    pub frames_processed: u64,
    pub frames_with_pose: u64,
    pub avg_movement_intensity: f64,
    pub dominant_limb: DominantLimb,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct SideTotals {
    pub(crate) left: f64,
    pub(crate) right: f64,
}

/// Append-only accumulator of movement across a whole video
pub struct MotionAggregator {
    computer: DisplacementComputer,
    frames_processed: u64,
    frames_with_pose: u64,
    sum_intensity: f64,
    pairs_with_intensity: u64,
    side_totals: SideTotals,
    previous_frame: Option<KeypointFrame>,
}

impl MotionAggregator {
    pub fn new(computer: DisplacementComputer) -> Self {
        Self {
            computer,
            frames_processed: 0,
            frames_with_pose: 0,
            sum_intensity: 0.0,
            pairs_with_intensity: 0,
            side_totals: SideTotals::default(),
            previous_frame: None,
        }
    }

    /// Fold one frame into the running totals. Frames must arrive in index order.
    pub fn update(&mut self, frame: KeypointFrame) {
        self.frames_processed += 1;
        if frame.pose_detected() {
            self.frames_with_pose += 1;
        }

        let previous = match self.previous_frame.take() {
            Some(previous) if previous.index() >= frame.index() => {
                warn!(
                    "Frame index went backwards ({} -> {}), treating as a gap",
                    previous.index(),
                    frame.index()
                );
                None
            }
            other => other,
        };

        if let Some(previous) = previous.filter(|p| p.pose_detected() && frame.pose_detected()) {
            let sample = self.computer.compute(&previous, &frame);

            if let Some(intensity) = sample.intensity() {
                self.sum_intensity += intensity;
                self.pairs_with_intensity += 1;

                if let Some(left) = sample.side_mean(Side::Left) {
                    self.side_totals.left += left;
                }
                if let Some(right) = sample.side_mean(Side::Right) {
                    self.side_totals.right += right;
                }

                trace!(
                    "Frame {} intensity {:.5} over {} joints",
                    frame.index(),
                    intensity,
                    sample.len()
                );
            } else {
                trace!(
                    "Frames {} and {} share no joints, no motion sample",
                    previous.index(),
                    frame.index()
                );
            }
        }

        self.previous_frame = Some(frame);
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn frames_with_pose(&self) -> u64 {
        self.frames_with_pose
    }

    pub fn pairs_with_intensity(&self) -> u64 {
        self.pairs_with_intensity
    }

    pub(crate) fn side_totals(&self) -> SideTotals {
        self.side_totals
    }

    /// Derive the final report, consuming the aggregator
    pub fn finalize(self) -> MotionReport {
        let avg = self.sum_intensity / self.pairs_with_intensity.max(1) as f64;

        let dominant_limb = if self.side_totals.left > self.side_totals.right {
            DominantLimb::Left
        } else if self.side_totals.right > self.side_totals.left {
            DominantLimb::Right
        } else {
            DominantLimb::Balanced
        };

        MotionReport {
            frames_processed: self.frames_processed,
            frames_with_pose: self.frames_with_pose,
            avg_movement_intensity: round_to(avg, 5),
            dominant_limb,
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Detection, Joint, Keypoint, Skeleton};
    use std::sync::Arc;

    fn aggregator() -> MotionAggregator {
        MotionAggregator::new(DisplacementComputer::new(Arc::new(Skeleton::default())))
    }

    fn detected(index: u64, joints: &[(Joint, f64, f64)]) -> KeypointFrame {
        let detection: Detection = joints
            .iter()
            .map(|(joint, x, y)| (*joint, Keypoint::new(*x, *y, 0.9)))
            .collect();
        KeypointFrame::from_detection(index, detection, &Skeleton::default())
    }

    fn pose_at(index: u64, offset: f64) -> KeypointFrame {
        detected(
            index,
            &[
                (Joint::LeftWrist, 0.2 + offset, 0.4),
                (Joint::RightWrist, 0.8, 0.4),
            ],
        )
    }

    #[test]
    fn test_empty_video_reports_zero() {
        let report = aggregator().finalize();
        assert_eq!(
            report,
            MotionReport {
                frames_processed: 0,
                frames_with_pose: 0,
                avg_movement_intensity: 0.0,
                dominant_limb: DominantLimb::Balanced,
            }
        );
    }

    #[test]
    fn test_single_frame() {
        let mut agg = aggregator();
        agg.update(pose_at(0, 0.0));
        let report = agg.finalize();
        assert_eq!(report.frames_processed, 1);
        assert_eq!(report.frames_with_pose, 1);
        assert_eq!(report.avg_movement_intensity, 0.0);
        assert_eq!(report.dominant_limb, DominantLimb::Balanced);
    }

    #[test]
    fn test_identical_frames_are_balanced() {
        let mut agg = aggregator();
        for i in 0..10 {
            agg.update(pose_at(i, 0.0));
        }
        assert_eq!(agg.pairs_with_intensity(), 9);
        let report = agg.finalize();
        assert_eq!(report.frames_with_pose, 10);
        assert_eq!(report.avg_movement_intensity, 0.0);
        assert_eq!(report.dominant_limb, DominantLimb::Balanced);
    }

    #[test]
    fn test_alternating_detection_yields_no_pairs() {
        let mut agg = aggregator();
        for i in 0..5u64 {
            if i % 2 == 0 {
                agg.update(pose_at(i, i as f64 * 0.1));
            } else {
                agg.update(KeypointFrame::undetected(i));
            }
        }
        assert_eq!(agg.pairs_with_intensity(), 0);
        let report = agg.finalize();
        assert_eq!(report.frames_processed, 5);
        assert_eq!(report.frames_with_pose, 3);
        assert_eq!(report.avg_movement_intensity, 0.0);
        assert_eq!(report.dominant_limb, DominantLimb::Balanced);
    }

    #[test]
    fn test_left_wrist_motion_dominates() {
        let mut agg = aggregator();
        agg.update(pose_at(0, 0.0));
        agg.update(pose_at(1, 0.1));
        agg.update(pose_at(2, 0.3));

        let totals = agg.side_totals();
        assert!((totals.left - 0.3).abs() < 1e-9);
        assert_eq!(totals.right, 0.0);

        let report = agg.finalize();
        // pair means: (0.1 + 0) / 2, (0.2 + 0) / 2
        assert!((report.avg_movement_intensity - 0.075).abs() < 1e-9);
        assert_eq!(report.dominant_limb, DominantLimb::Left);
    }

    #[test]
    fn test_pairs_weighted_equally_regardless_of_joint_count() {
        let mut agg = aggregator();
        // one joint moving 0.4
        agg.update(detected(0, &[(Joint::RightKnee, 0.5, 0.1)]));
        agg.update(detected(1, &[(Joint::RightKnee, 0.5, 0.5)]));
        agg.update(KeypointFrame::undetected(2));
        // four still joints
        let still = [
            (Joint::Nose, 0.5, 0.1),
            (Joint::LeftHip, 0.4, 0.6),
            (Joint::RightHip, 0.6, 0.6),
            (Joint::LeftKnee, 0.4, 0.8),
        ];
        agg.update(detected(3, &still));
        agg.update(detected(4, &still));

        let report = agg.finalize();
        assert!((report.avg_movement_intensity - 0.2).abs() < 1e-9);
        assert_eq!(report.dominant_limb, DominantLimb::Right);
    }

    #[test]
    fn test_undetected_frame_breaks_the_chain() {
        let mut agg = aggregator();
        agg.update(pose_at(0, 0.0));
        agg.update(KeypointFrame::undetected(1));
        agg.update(pose_at(2, 0.5));
        assert_eq!(agg.pairs_with_intensity(), 0);
    }

    #[test]
    fn test_out_of_order_frame_is_a_gap() {
        let mut agg = aggregator();
        agg.update(pose_at(5, 0.0));
        agg.update(pose_at(3, 0.2));
        assert_eq!(agg.pairs_with_intensity(), 0);
        assert_eq!(agg.frames_processed(), 2);
    }

    #[test]
    fn test_frames_with_pose_never_exceeds_frames_processed() {
        let mut agg = aggregator();
        for i in 0..50u64 {
            if i % 3 == 0 || i % 7 == 0 {
                agg.update(KeypointFrame::undetected(i));
            } else {
                agg.update(pose_at(i, (i % 5) as f64 * 0.01));
            }
            assert!(agg.frames_with_pose() <= agg.frames_processed());
        }
    }

    #[test]
    fn test_report_serializes_lowercase_limb() {
        let report = MotionReport {
            frames_processed: 3,
            frames_with_pose: 2,
            avg_movement_intensity: 0.01234,
            dominant_limb: DominantLimb::Balanced,
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json["dominant_limb"], "balanced");
        assert_eq!(json["frames_with_pose"], 2);
    }
}
