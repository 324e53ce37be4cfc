mod joint;
mod keypoint;
mod skeleton;

pub use joint::{Joint, Side, POSE_CONNECTIONS};
pub use keypoint::{Detection, Keypoint, KeypointFrame};
pub use skeleton::Skeleton;
