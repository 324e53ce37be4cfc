use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct DancecamConfig {
    #[serde(default)]
    pub pose: PoseConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub system: SystemConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PoseConfig {
    /// Minimum landmark confidence for a joint to count as detected.
    ///
    /// Applied per landmark, so low-visibility joints drop out of the motion metrics.
    /// Set to 0.0 to keep every landmark the detector returns.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Minimum number of detected joints for a frame to count as a pose
    #[serde(default = "default_min_joints")]
    pub min_joints: usize,

    /// Joints that take part in the left/right comparison
    #[serde(default = "default_side_joints")]
    pub side_joints: SideJoints,
}

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SideJoints {
    /// Shoulders, elbows, wrists, hips, knees and ankles
    Limbs,
    /// Every joint with a side
    All,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RenderConfig {
    /// RGB color of joint markers
    #[serde(default = "default_landmark_color")]
    pub landmark_color: [u8; 3],

    /// RGB color of bone segments
    #[serde(default = "default_connection_color")]
    pub connection_color: [u8; 3],

    /// Bone line thickness in pixels
    #[serde(default = "default_thickness")]
    pub thickness: u32,

    /// Joint marker radius in pixels
    #[serde(default = "default_landmark_radius")]
    pub landmark_radius: u32,

    /// Annotate each frame with its frame number
    #[serde(default = "default_frame_label")]
    pub frame_label: bool,

    /// Path to TrueType font file for the frame label
    #[serde(default = "default_font_path")]
    pub font_path: String,

    /// Font size for the frame label
    #[serde(default = "default_font_size")]
    pub font_size: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PipelineConfig {
    /// Stop after this many frames
    pub max_frames: Option<u64>,

    /// Output frame rate; defaults to the input frame rate
    pub target_fps: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputConfig {
    /// Directory for rendered videos and run metadata
    #[serde(default = "default_output_path")]
    pub path: String,

    /// Save a metadata JSON file per analysis run
    #[serde(default = "default_save_metadata")]
    pub save_metadata: bool,

    /// Image format for frame-directory output
    #[serde(default = "default_image_format")]
    pub image_format: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SystemConfig {
    /// Maximum number of concurrent analysis runs
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl DancecamConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let landmark_color: Vec<i64> = default_landmark_color().iter().map(|c| *c as i64).collect();
        let connection_color: Vec<i64> =
            default_connection_color().iter().map(|c| *c as i64).collect();

        let settings = Config::builder()
            .set_default("pose.min_confidence", default_min_confidence())?
            .set_default("pose.min_joints", default_min_joints() as i64)?
            .set_default("pose.side_joints", "limbs")?
            .set_default("render.landmark_color", landmark_color)?
            .set_default("render.connection_color", connection_color)?
            .set_default("render.thickness", default_thickness())?
            .set_default("render.landmark_radius", default_landmark_radius())?
            .set_default("render.frame_label", default_frame_label())?
            .set_default("render.font_path", default_font_path())?
            .set_default("render.font_size", default_font_size() as f64)?
            .set_default("output.path", default_output_path())?
            .set_default("output.save_metadata", default_save_metadata())?
            .set_default("output.image_format", default_image_format())?
            .set_default("system.jobs", default_jobs() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // Environment overrides, e.g. DANCECAM_POSE__MIN_CONFIDENCE=0.7
            .add_source(
                Environment::with_prefix("DANCECAM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: DancecamConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.pose.min_confidence) {
            return Err(ConfigError::Message(
                "Pose min_confidence must be between 0 and 1".to_string(),
            ));
        }

        if self.pose.min_joints == 0 {
            return Err(ConfigError::Message(
                "Pose min_joints must be greater than 0".to_string(),
            ));
        }

        if self.render.thickness == 0 {
            return Err(ConfigError::Message(
                "Render thickness must be greater than 0".to_string(),
            ));
        }

        if self.render.font_size <= 0.0 {
            return Err(ConfigError::Message(
                "Render font_size must be greater than 0".to_string(),
            ));
        }

        if self.pipeline.max_frames == Some(0) {
            return Err(ConfigError::Message(
                "Pipeline max_frames must be greater than 0 when set".to_string(),
            ));
        }

        if let Some(fps) = self.pipeline.target_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(ConfigError::Message(
                    "Pipeline target_fps must be greater than 0 when set".to_string(),
                ));
            }
        }

        if image::ImageFormat::from_extension(&self.output.image_format).is_none() {
            return Err(ConfigError::Message(format!(
                "Unknown output image_format '{}'",
                self.output.image_format
            )));
        }

        if self.system.jobs == 0 {
            return Err(ConfigError::Message(
                "System jobs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            min_joints: default_min_joints(),
            side_joints: default_side_joints(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            landmark_color: default_landmark_color(),
            connection_color: default_connection_color(),
            thickness: default_thickness(),
            landmark_radius: default_landmark_radius(),
            frame_label: default_frame_label(),
            font_path: default_font_path(),
            font_size: default_font_size(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            save_metadata: default_save_metadata(),
            image_format: default_image_format(),
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

// Default value functions
fn default_min_confidence() -> f64 {
    0.5
}
fn default_min_joints() -> usize {
    1
}
fn default_side_joints() -> SideJoints {
    SideJoints::Limbs
}

fn default_landmark_color() -> [u8; 3] {
    [255, 0, 0]
}
fn default_connection_color() -> [u8; 3] {
    [0, 255, 0]
}
fn default_thickness() -> u32 {
    2
}
fn default_landmark_radius() -> u32 {
    2
}
fn default_frame_label() -> bool {
    true
}
fn default_font_path() -> String {
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf".to_string()
}
fn default_font_size() -> f32 {
    16.0
}

fn default_output_path() -> String {
    "./output".to_string()
}
fn default_save_metadata() -> bool {
    true
}
fn default_image_format() -> String {
    "png".to_string()
}

fn default_jobs() -> usize {
    2
}
