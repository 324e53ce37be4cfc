use crate::pose::joint::Joint;
use crate::pose::skeleton::Skeleton;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Landmark position in normalized image coordinates with detector confidence
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
    pub confidence: f64,
}

impl Keypoint {
    /// Coordinate bounds for a usable landmark; points a little outside the frame are kept
    pub const MIN_COORD: f64 = -1.0;
    pub const MAX_COORD: f64 = 2.0;

    pub fn new(x: f64, y: f64, confidence: f64) -> Self {
        Self { x, y, confidence }
    }

    /// Whether both coordinates are finite and within the usable bounds
    pub fn in_bounds(&self) -> bool {
        let range = Self::MIN_COORD..=Self::MAX_COORD;
        range.contains(&self.x) && range.contains(&self.y)
    }

    pub fn distance(&self, other: &Keypoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Raw output of one detector invocation, before thresholds are applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    pub landmarks: BTreeMap<Joint, Keypoint>,
}

impl Detection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}

impl FromIterator<(Joint, Keypoint)> for Detection {
    fn from_iter<I: IntoIterator<Item = (Joint, Keypoint)>>(iter: I) -> Self {
        Self {
            landmarks: iter.into_iter().collect(),
        }
    }
}

/// Normalized per-frame keypoint set. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct KeypointFrame {
    index: u64,
    joints: BTreeMap<Joint, Keypoint>,
    pose_detected: bool,
}

impl KeypointFrame {
    /// Apply the skeleton's confidence and joint-count thresholds to a raw detection.
    ///
    /// A frame that misses the joint-count threshold keeps no joints, so nothing
    /// downstream can draw or diff a partial pose.
    pub fn from_detection(index: u64, detection: Detection, skeleton: &Skeleton) -> Self {
        let joints: BTreeMap<Joint, Keypoint> = detection
            .landmarks
            .into_iter()
            .filter(|(_, kp)| kp.confidence >= skeleton.min_confidence())
            .filter(|(_, kp)| kp.in_bounds())
            .collect();

        if joints.is_empty() || joints.len() < skeleton.min_joints() {
            return Self::undetected(index);
        }

        Self {
            index,
            joints,
            pose_detected: true,
        }
    }

    /// Frame with no pose and an empty joint mapping
    pub fn undetected(index: u64) -> Self {
        Self {
            index,
            joints: BTreeMap::new(),
            pose_detected: false,
        }
    }

    pub fn index(&self) -> u64 {
        self.index
    }

    pub fn pose_detected(&self) -> bool {
        self.pose_detected
    }

    pub fn get(&self, joint: Joint) -> Option<&Keypoint> {
        self.joints.get(&joint)
    }

    pub fn joints(&self) -> impl Iterator<Item = (Joint, &Keypoint)> {
        self.joints.iter().map(|(joint, kp)| (*joint, kp))
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }
}
