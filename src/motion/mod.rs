mod aggregator;
mod displacement;

pub use aggregator::{DominantLimb, MotionAggregator, MotionReport};
pub use displacement::{DisplacementComputer, DisplacementSample};
