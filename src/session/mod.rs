//! Analysis runs over files on disk: input resolution, output naming, run metadata and
//! bounded concurrency across several inputs.

mod metadata;
mod runner;

pub use metadata::AnalysisMetadata;
pub use runner::{AnalysisRequest, AnalysisSession, InputKind};
