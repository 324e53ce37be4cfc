use crate::error::{DancecamError, Result};
use crate::motion::MotionReport;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Record of one completed analysis run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnalysisMetadata {
    pub run_id: String,
    pub input: PathBuf,
    pub keypoints: PathBuf,
    pub output: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub report: MotionReport,
}

impl AnalysisMetadata {
    /// Metadata file path for this run under `dir`
    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.run_id))
    }
}

pub(crate) async fn save_metadata(metadata: &AnalysisMetadata, dir: &Path) -> Result<PathBuf> {
    let metadata_json = serde_json::to_string_pretty(metadata).map_err(|e| {
        DancecamError::component(
            "analysis_session",
            &format!("Failed to serialize metadata: {}", e),
        )
    })?;

    fs::create_dir_all(dir).await.map_err(|e| {
        DancecamError::component(
            "analysis_session",
            &format!("Failed to create metadata directory: {}", e),
        )
    })?;

    let metadata_path = metadata.path_in(dir);
    fs::write(&metadata_path, metadata_json).await.map_err(|e| {
        DancecamError::component(
            "analysis_session",
            &format!("Failed to write metadata file: {}", e),
        )
    })?;

    debug!("Saved metadata to {}", metadata_path.display());
    Ok(metadata_path)
}
