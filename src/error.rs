use thiserror::Error;

#[derive(Error, Debug)]
pub enum DancecamError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Deserialization error: {0}")]
    Deserialization(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Detection error: {0}")]
    Detection(#[from] DetectionError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("System error: {message}")]
    System { message: String },

    #[error("Component error in {component}: {message}")]
    Component { component: String, message: String },
}

/// Failures of video sources and sinks
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open '{path}': {details}")]
    Open { path: String, details: String },

    #[error("Frame read failed: {details}")]
    Read { details: String },

    #[error("Frame write failed: {details}")]
    Write { details: String },

    #[error("Encoding failed: {details}")]
    Encoding { details: String },

    #[error("Unsupported input: {details}")]
    Unsupported { details: String },
}

/// Failures of a single detector invocation
#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Malformed detector input for frame {frame_index}: {details}")]
    MalformedInput { frame_index: u64, details: String },
}

/// Run-level fatal conditions of the analysis pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source read failed at frame {frame_index}: {source}")]
    SourceRead {
        frame_index: u64,
        #[source]
        source: VideoError,
    },

    #[error("Sink write failed at frame {frame_index}: {source}")]
    SinkWrite {
        frame_index: u64,
        #[source]
        source: VideoError,
    },

    #[error("Sink close failed after {frames_written} frames: {source}")]
    SinkClose {
        frames_written: u64,
        #[source]
        source: VideoError,
    },
}

impl PipelineError {
    /// Index of the frame at which the run failed
    pub fn frame_index(&self) -> u64 {
        match self {
            PipelineError::SourceRead { frame_index, .. }
            | PipelineError::SinkWrite { frame_index, .. } => *frame_index,
            PipelineError::SinkClose { frames_written, .. } => *frames_written,
        }
    }
}

impl DancecamError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }

    pub fn component<S: Into<String>>(component: S, message: S) -> Self {
        Self::Component {
            component: component.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DancecamError>;
