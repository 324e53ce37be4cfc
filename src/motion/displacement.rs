use crate::pose::{Joint, KeypointFrame, Side, Skeleton};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-joint displacement between two consecutive frames.
///
/// Only joints detected in both frames appear; an absent joint never reads as zero motion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplacementSample {
    distances: BTreeMap<Joint, f64>,
    left: SideAccumulator,
    right: SideAccumulator,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct SideAccumulator {
    sum: f64,
    count: usize,
}

impl SideAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }

    fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            None
        } else {
            Some(self.sum / self.count as f64)
        }
    }
}

impl DisplacementSample {
    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn get(&self, joint: Joint) -> Option<f64> {
        self.distances.get(&joint).copied()
    }

    /// Mean displacement over all joints in the sample
    pub fn intensity(&self) -> Option<f64> {
        if self.distances.is_empty() {
            return None;
        }
        let sum: f64 = self.distances.values().sum();
        Some(sum / self.distances.len() as f64)
    }

    /// Mean displacement over the side-comparison joints of one side
    pub fn side_mean(&self, side: Side) -> Option<f64> {
        match side {
            Side::Left => self.left.mean(),
            Side::Right => self.right.mean(),
            Side::Center => None,
        }
    }
}

/// Computes joint displacement between consecutive keypoint frames
#[derive(Debug, Clone)]
pub struct DisplacementComputer {
    skeleton: Arc<Skeleton>,
}

impl DisplacementComputer {
    pub fn new(skeleton: Arc<Skeleton>) -> Self {
        Self { skeleton }
    }

    pub fn compute(&self, previous: &KeypointFrame, current: &KeypointFrame) -> DisplacementSample {
        let mut sample = DisplacementSample::default();

        for (joint, before) in previous.joints() {
            let Some(after) = current.get(joint) else {
                continue;
            };

            let distance = before.distance(after);
            sample.distances.insert(joint, distance);

            match self.skeleton.comparison_side(joint) {
                Some(Side::Left) => sample.left.push(distance),
                Some(Side::Right) => sample.right.push(distance),
                _ => {}
            }
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{Detection, Keypoint};

    fn frame(index: u64, joints: &[(Joint, f64, f64)]) -> KeypointFrame {
        let detection: Detection = joints
            .iter()
            .map(|(joint, x, y)| (*joint, Keypoint::new(*x, *y, 1.0)))
            .collect();
        KeypointFrame::from_detection(index, detection, &Skeleton::default())
    }

    fn computer() -> DisplacementComputer {
        DisplacementComputer::new(Arc::new(Skeleton::default()))
    }

    #[test]
    fn test_common_joints_only() {
        let a = frame(0, &[(Joint::Nose, 0.5, 0.5), (Joint::LeftWrist, 0.2, 0.2)]);
        let b = frame(1, &[(Joint::Nose, 0.5, 0.6), (Joint::RightWrist, 0.8, 0.2)]);

        let sample = computer().compute(&a, &b);
        assert_eq!(sample.len(), 1);
        assert!((sample.get(Joint::Nose).unwrap() - 0.1).abs() < 1e-12);
        assert!(sample.get(Joint::LeftWrist).is_none());
        assert!(sample.get(Joint::RightWrist).is_none());
    }

    #[test]
    fn test_no_common_joints_is_empty_not_zero() {
        let a = frame(0, &[(Joint::LeftWrist, 0.2, 0.2)]);
        let b = frame(1, &[(Joint::RightWrist, 0.8, 0.2)]);

        let sample = computer().compute(&a, &b);
        assert!(sample.is_empty());
        assert_eq!(sample.intensity(), None);
        assert_eq!(sample.side_mean(Side::Left), None);
    }

    #[test]
    fn test_intensity_and_side_means() {
        let a = frame(
            0,
            &[
                (Joint::Nose, 0.5, 0.5),
                (Joint::LeftWrist, 0.2, 0.2),
                (Joint::LeftElbow, 0.3, 0.3),
                (Joint::RightWrist, 0.8, 0.2),
            ],
        );
        let b = frame(
            1,
            &[
                (Joint::Nose, 0.5, 0.5),
                (Joint::LeftWrist, 0.2, 0.5),
                (Joint::LeftElbow, 0.3, 0.4),
                (Joint::RightWrist, 0.8, 0.3),
            ],
        );

        let sample = computer().compute(&a, &b);
        // 0.0, 0.3, 0.1, 0.1
        assert!((sample.intensity().unwrap() - 0.125).abs() < 1e-12);
        assert!((sample.side_mean(Side::Left).unwrap() - 0.2).abs() < 1e-12);
        assert!((sample.side_mean(Side::Right).unwrap() - 0.1).abs() < 1e-12);
        assert_eq!(sample.side_mean(Side::Center), None);
    }

    #[test]
    fn test_side_without_contributors_is_excluded() {
        let a = frame(0, &[(Joint::LeftKnee, 0.4, 0.7), (Joint::RightEye, 0.6, 0.1)]);
        let b = frame(1, &[(Joint::LeftKnee, 0.4, 0.8), (Joint::RightEye, 0.6, 0.2)]);

        let sample = computer().compute(&a, &b);
        assert_eq!(sample.len(), 2);
        assert!(sample.side_mean(Side::Left).is_some());
        // Eyes are not limb joints, so the right side has nothing to compare
        assert_eq!(sample.side_mean(Side::Right), None);
    }

    #[test]
    fn test_symmetric_magnitudes() {
        let a = frame(0, &[(Joint::LeftHip, 0.1, 0.9), (Joint::RightHip, 0.3, 0.8)]);
        let b = frame(1, &[(Joint::LeftHip, 0.4, 0.5), (Joint::RightHip, 0.35, 0.82)]);

        let forward = computer().compute(&a, &b);
        let backward = computer().compute(&b, &a);
        assert_eq!(forward, backward);
    }
}
