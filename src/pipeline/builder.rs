use crate::config::{DancecamConfig, PipelineConfig, PoseConfig, RenderConfig};
use crate::detector::PoseDetector;
use crate::error::{DancecamError, Result};
use crate::pipeline::core::AnalysisPipeline;
use crate::pose::Skeleton;
use crate::render::{FrameLabeler, SkeletonRenderer};
use std::sync::Arc;

/// Builder for AnalysisPipeline
pub struct AnalysisPipelineBuilder {
    pose: Option<PoseConfig>,
    render: Option<RenderConfig>,
    pipeline: Option<PipelineConfig>,
    detector: Option<Box<dyn PoseDetector>>,
    frame_labels: Option<bool>,
}

impl AnalysisPipelineBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            pose: None,
            render: None,
            pipeline: None,
            detector: None,
            frame_labels: None,
        }
    }

    /// Take pose, render and pipeline settings from a full configuration
    pub fn config(mut self, config: &DancecamConfig) -> Self {
        self.pose = Some(config.pose.clone());
        self.render = Some(config.render.clone());
        self.pipeline = Some(config.pipeline.clone());
        self
    }

    pub fn pose_config(mut self, pose: PoseConfig) -> Self {
        self.pose = Some(pose);
        self
    }

    pub fn render_config(mut self, render: RenderConfig) -> Self {
        self.render = Some(render);
        self
    }

    pub fn pipeline_config(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Set the pose detector
    pub fn detector<D: PoseDetector + 'static>(mut self, detector: D) -> Self {
        self.detector = Some(Box::new(detector));
        self
    }

    /// Override `render.frame_label`
    pub fn frame_labels(mut self, enabled: bool) -> Self {
        self.frame_labels = Some(enabled);
        self
    }

    /// Build the pipeline
    pub fn build(self) -> Result<AnalysisPipeline> {
        let detector = self.detector.ok_or_else(|| {
            DancecamError::component("analysis_pipeline_builder", "Detector is required")
        })?;

        let pose = self.pose.unwrap_or_default();
        let mut render = self.render.unwrap_or_default();
        let pipeline = self.pipeline.unwrap_or_default();

        if let Some(enabled) = self.frame_labels {
            render.frame_label = enabled;
        }

        let skeleton = Arc::new(Skeleton::from_config(&pose));
        let renderer = SkeletonRenderer::new(Arc::clone(&skeleton), &render);
        let labeler = FrameLabeler::from_config(&render);

        Ok(AnalysisPipeline::from_parts(
            skeleton,
            renderer,
            labeler,
            detector,
            pipeline.max_frames,
        ))
    }
}

impl Default for AnalysisPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
