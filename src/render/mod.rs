mod overlay;
mod skeleton;

pub use overlay::FrameLabeler;
pub use skeleton::SkeletonRenderer;
