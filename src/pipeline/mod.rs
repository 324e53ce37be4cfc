mod builder;
mod core;
#[cfg(test)]
mod tests;

pub use self::builder::AnalysisPipelineBuilder;
pub use self::core::{AnalysisPipeline, PipelineState};
