use crate::detector::PoseDetector;
use crate::error::{DancecamError, DetectionError, Result};
use crate::frame::FrameData;
use crate::pose::{Detection, Joint, Keypoint};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One line of a keypoint track file
#[derive(Debug, Clone, Deserialize)]
struct TrackRecord {
    frame: u64,
    /// Landmarks in detector index order; `null` entries are missing joints
    #[serde(default)]
    landmarks: Option<Vec<Option<Vec<f64>>>>,
    /// Landmarks keyed by joint name
    #[serde(default)]
    keypoints: Option<BTreeMap<String, Vec<f64>>>,
}

/// Replays per-frame landmarks recorded by an external pose model.
///
/// The track is a JSON-lines file, one record per frame with a detected pose:
///
/// ```text
/// {"frame": 0, "landmarks": [[0.51, 0.22, 0.99], [0.52, 0.20, 0.98], ...]}
/// {"frame": 1, "keypoints": {"left_wrist": [0.31, 0.64, 0.9], "nose": [0.5, 0.2]}}
/// ```
///
/// Frames without a record have no pose. Each point is `[x, y]` or `[x, y, confidence]`
/// in normalized image coordinates.
pub struct KeypointTrackDetector {
    path: PathBuf,
    records: HashMap<u64, TrackRecord>,
}

impl KeypointTrackDetector {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let contents = fs::read_to_string(&path).map_err(|e| {
            DancecamError::component(
                "keypoint_track",
                &format!("Failed to read track '{}': {}", path.display(), e),
            )
        })?;

        let detector = Self::parse(&contents).map_err(|e| {
            DancecamError::component(
                "keypoint_track",
                &format!("Invalid track '{}': {}", path.display(), e),
            )
        })?;

        info!(
            "Loaded keypoint track {} ({} frames with landmarks)",
            path.display(),
            detector.records.len()
        );

        Ok(Self { path, ..detector })
    }

    /// Parse track contents. Fails on JSON syntax errors only; bad joint data is
    /// reported per frame by [`PoseDetector::detect`].
    pub fn parse(contents: &str) -> std::result::Result<Self, String> {
        let mut records = HashMap::new();
        for (line_no, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let record: TrackRecord = serde_json::from_str(line)
                .map_err(|e| format!("line {}: {}", line_no + 1, e))?;
            records.insert(record.frame, record);
        }

        Ok(Self {
            path: PathBuf::new(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn to_keypoint(frame_index: u64, what: &str, values: &[f64]) -> std::result::Result<Keypoint, DetectionError> {
    let keypoint = match values {
        [x, y] => Keypoint::new(*x, *y, 1.0),
        [x, y, confidence] => Keypoint::new(*x, *y, *confidence),
        _ => {
            return Err(DetectionError::MalformedInput {
                frame_index,
                details: format!("{} has {} values, expected 2 or 3", what, values.len()),
            })
        }
    };

    if !keypoint.in_bounds() {
        return Err(DetectionError::MalformedInput {
            frame_index,
            details: format!(
                "{} at ({}, {}) is outside normalized coordinates",
                what, keypoint.x, keypoint.y
            ),
        });
    }

    Ok(keypoint)
}

impl PoseDetector for KeypointTrackDetector {
    fn detect(&mut self, frame: &FrameData) -> std::result::Result<Detection, DetectionError> {
        let Some(record) = self.records.get(&frame.index) else {
            debug!("No landmarks recorded for frame {}", frame.index);
            return Ok(Detection::empty());
        };

        let mut landmarks = BTreeMap::new();

        if let Some(points) = &record.landmarks {
            if points.len() > Joint::COUNT {
                return Err(DetectionError::MalformedInput {
                    frame_index: frame.index,
                    details: format!(
                        "{} landmarks, topology has {}",
                        points.len(),
                        Joint::COUNT
                    ),
                });
            }
            for (i, point) in points.iter().enumerate() {
                let (Some(values), Some(joint)) = (point, Joint::from_index(i)) else {
                    continue;
                };
                landmarks.insert(joint, to_keypoint(frame.index, joint.name(), values)?);
            }
        }

        if let Some(named) = &record.keypoints {
            for (name, values) in named {
                let joint: Joint = name.parse().map_err(|e| DetectionError::MalformedInput {
                    frame_index: frame.index,
                    details: e,
                })?;
                landmarks.insert(joint, to_keypoint(frame.index, name, values)?);
            }
        }

        Ok(Detection { landmarks })
    }

    fn name(&self) -> &str {
        "keypoint_track"
    }
}
