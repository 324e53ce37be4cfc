use crate::config::{PoseConfig, SideJoints};
use crate::pose::joint::{Joint, Side, POSE_CONNECTIONS};

/// Immutable skeleton topology and detection thresholds shared by a run
#[derive(Debug, Clone)]
pub struct Skeleton {
    connections: Vec<(Joint, Joint)>,
    side_eligible: [bool; Joint::COUNT],
    min_confidence: f64,
    min_joints: usize,
}

impl Skeleton {
    pub fn from_config(config: &PoseConfig) -> Self {
        let mut side_eligible = [false; Joint::COUNT];
        match config.side_joints {
            SideJoints::Limbs => {
                for joint in Joint::LIMBS {
                    side_eligible[joint.index()] = true;
                }
            }
            SideJoints::All => {
                for joint in Joint::ALL {
                    side_eligible[joint.index()] = joint.side() != Side::Center;
                }
            }
        }

        Self {
            connections: POSE_CONNECTIONS.to_vec(),
            side_eligible,
            min_confidence: config.min_confidence,
            min_joints: config.min_joints,
        }
    }

    pub fn connections(&self) -> &[(Joint, Joint)] {
        &self.connections
    }

    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    pub fn min_joints(&self) -> usize {
        self.min_joints
    }

    /// Side a joint contributes to in left/right comparison, if any
    pub fn comparison_side(&self, joint: Joint) -> Option<Side> {
        if self.side_eligible[joint.index()] {
            Some(joint.side())
        } else {
            None
        }
    }
}

impl Default for Skeleton {
    fn default() -> Self {
        Self::from_config(&PoseConfig::default())
    }
}
