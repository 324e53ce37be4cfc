use crate::config::DancecamConfig;
use crate::detector::KeypointTrackDetector;
use crate::error::{DancecamError, Result, VideoError};
use crate::pipeline::AnalysisPipelineBuilder;
use crate::video::{
    is_video_file, ImageSequenceSink, ImageSequenceSource, VideoSink, VideoSource,
    VIDEO_EXTENSIONS,
};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info, info_span};
use uuid::Uuid;

use super::metadata::{save_metadata, AnalysisMetadata};

/// Output frame rate when neither the configuration nor the source provides one
const DEFAULT_FPS: f64 = 30.0;

/// What kind of input a path names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Directory of numbered image files
    FrameDirectory,
    /// Encoded video container
    VideoFile,
}

impl InputKind {
    /// Classify an input path, rejecting anything that is neither a directory nor a
    /// video container with an accepted extension
    pub fn classify(path: &Path) -> Result<Self> {
        if path.is_dir() {
            return Ok(InputKind::FrameDirectory);
        }

        if !is_video_file(path) {
            return Err(VideoError::Unsupported {
                details: format!(
                    "'{}' is not a frame directory or a video file ({})",
                    path.display(),
                    VIDEO_EXTENSIONS.join(", ")
                ),
            }
            .into());
        }

        if !path.is_file() {
            return Err(VideoError::Open {
                path: path.display().to_string(),
                details: "no such file".to_string(),
            }
            .into());
        }

        Ok(InputKind::VideoFile)
    }

    /// Where the keypoint track for `input` is looked up when none is given:
    /// `keypoints.jsonl` inside a frame directory, `<stem>.keypoints.jsonl` next to a video
    pub fn default_keypoint_track(self, input: &Path) -> PathBuf {
        match self {
            InputKind::FrameDirectory => input.join("keypoints.jsonl"),
            InputKind::VideoFile => input.with_extension("keypoints.jsonl"),
        }
    }
}

/// One input to analyze
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub input: PathBuf,
    pub keypoints: Option<PathBuf>,
}

impl AnalysisRequest {
    pub fn new<P: Into<PathBuf>>(input: P) -> Self {
        Self {
            input: input.into(),
            keypoints: None,
        }
    }

    pub fn with_keypoints<P: Into<PathBuf>>(mut self, keypoints: P) -> Self {
        self.keypoints = Some(keypoints.into());
        self
    }
}

/// Runs analyses against a shared configuration
#[derive(Clone)]
pub struct AnalysisSession {
    config: Arc<DancecamConfig>,
}

impl AnalysisSession {
    pub fn new(config: DancecamConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &DancecamConfig {
        &self.config
    }

    /// Analyze one input on the blocking pool and record its metadata
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisMetadata> {
        let config = Arc::clone(&self.config);
        let metadata = tokio::task::spawn_blocking(move || run(&config, request))
            .await
            .map_err(|e| DancecamError::system(format!("Analysis task failed: {}", e)))??;

        if self.config.output.save_metadata {
            save_metadata(&metadata, Path::new(&self.config.output.path)).await?;
        }

        Ok(metadata)
    }

    /// Analyze several inputs, at most `system.jobs` at a time.
    ///
    /// Results are returned in request order; one failing input does not affect the others.
    pub async fn analyze_all(&self, requests: Vec<AnalysisRequest>) -> Vec<Result<AnalysisMetadata>> {
        let semaphore = Arc::new(Semaphore::new(self.config.system.jobs.max(1)));
        let mut handles = Vec::with_capacity(requests.len());

        for request in requests {
            let semaphore = Arc::clone(&semaphore);
            let session = self.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| DancecamError::system(format!("Job limiter closed: {}", e)))?;
                session.analyze(request).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let result = handle
                .await
                .map_err(|e| DancecamError::system(format!("Analysis task failed: {}", e)))
                .and_then(|result| result);
            results.push(result);
        }
        results
    }
}

fn run(config: &DancecamConfig, request: AnalysisRequest) -> Result<AnalysisMetadata> {
    let run_id = Uuid::new_v4().to_string();
    let span = info_span!("analysis", run_id = %run_id);
    let _enter = span.enter();

    let started_at = Utc::now();
    let input = request.input;

    let kind = InputKind::classify(&input)?;
    let keypoints = request
        .keypoints
        .unwrap_or_else(|| kind.default_keypoint_track(&input));
    let detector = KeypointTrackDetector::load(&keypoints)?;

    let output_dir = PathBuf::from(&config.output.path);
    std::fs::create_dir_all(&output_dir)?;

    let mut source = open_source(&input, kind, config.pipeline.target_fps)?;
    let fps = config
        .pipeline
        .target_fps
        .or_else(|| source.frame_rate())
        .unwrap_or(DEFAULT_FPS);
    let (output, mut sink) = open_sink(&output_dir, &run_id, kind, fps, &config.output.image_format)?;

    info!(
        "Analyzing {} -> {} ({:?}, {:.2} fps)",
        input.display(),
        output.display(),
        kind,
        fps
    );

    let mut pipeline = AnalysisPipelineBuilder::new()
        .config(config)
        .detector(detector)
        .build()?;

    let report = pipeline.analyze(&mut source, &mut sink).map_err(|e| {
        error!("Analysis of {} failed: {}", input.display(), e);
        e
    })?;

    Ok(AnalysisMetadata {
        run_id,
        input,
        keypoints,
        output,
        started_at,
        finished_at: Utc::now(),
        report,
    })
}

fn open_source(input: &Path, kind: InputKind, fps: Option<f64>) -> Result<Box<dyn VideoSource>> {
    match kind {
        InputKind::FrameDirectory => Ok(Box::new(ImageSequenceSource::open(input, fps)?)),
        InputKind::VideoFile => open_video_file(input),
    }
}

fn open_sink(
    output_dir: &Path,
    run_id: &str,
    kind: InputKind,
    fps: f64,
    image_format: &str,
) -> Result<(PathBuf, Box<dyn VideoSink>)> {
    match kind {
        InputKind::FrameDirectory => {
            let path = output_dir.join(format!("{}_skeleton", run_id));
            let sink = ImageSequenceSink::create(&path, image_format)?;
            Ok((path, Box::new(sink)))
        }
        InputKind::VideoFile => {
            let path = output_dir.join(format!("{}_skeleton.mp4", run_id));
            let sink = create_video_file(&path, fps)?;
            Ok((path, sink))
        }
    }
}

#[cfg(all(feature = "video", target_os = "linux"))]
fn open_video_file(input: &Path) -> Result<Box<dyn VideoSource>> {
    Ok(Box::new(crate::video::GstVideoSource::open(input)?))
}

#[cfg(not(all(feature = "video", target_os = "linux")))]
fn open_video_file(input: &Path) -> Result<Box<dyn VideoSource>> {
    Err(VideoError::Unsupported {
        details: format!(
            "decoding '{}' requires the `video` feature",
            input.display()
        ),
    }
    .into())
}

#[cfg(all(feature = "video", target_os = "linux"))]
fn create_video_file(path: &Path, fps: f64) -> Result<Box<dyn VideoSink>> {
    Ok(Box::new(crate::video::GstVideoSink::create(path, fps)?))
}

#[cfg(not(all(feature = "video", target_os = "linux")))]
fn create_video_file(path: &Path, _fps: f64) -> Result<Box<dyn VideoSink>> {
    Err(VideoError::Unsupported {
        details: format!("encoding '{}' requires the `video` feature", path.display()),
    }
    .into())
}
