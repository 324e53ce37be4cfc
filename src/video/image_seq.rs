use crate::error::VideoError;
use crate::frame::FrameData;
use crate::video::{VideoSink, VideoSource};
use image::ImageFormat;
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Frames read from a directory of numbered image files, in numeric name order
/// (`frame_2.png` before `frame_10.png`)
pub struct ImageSequenceSource {
    files: Vec<PathBuf>,
    position: usize,
    fps: Option<f64>,
}

impl ImageSequenceSource {
    pub fn open<P: AsRef<Path>>(dir: P, fps: Option<f64>) -> Result<Self, VideoError> {
        let dir = dir.as_ref().to_path_buf();
        let entries = fs::read_dir(&dir).map_err(|e| VideoError::Open {
            path: dir.display().to_string(),
            details: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VideoError::Open {
                path: dir.display().to_string(),
                details: e.to_string(),
            })?;
            let path = entry.path();
            if path.is_file() && ImageFormat::from_path(&path).is_ok() {
                files.push(path);
            }
        }
        files.sort_by(|a, b| natural_cmp(&file_name(a), &file_name(b)));

        info!(
            "Opened image sequence {} ({} frames)",
            dir.display(),
            files.len()
        );

        Ok(Self {
            files,
            position: 0,
            fps,
        })
    }
}

impl VideoSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<FrameData>, VideoError> {
        let Some(path) = self.files.get(self.position) else {
            return Ok(None);
        };

        let image = image::open(path)
            .map_err(|e| VideoError::Read {
                details: format!("{}: {}", path.display(), e),
            })?
            .to_rgb8();

        let index = self.position as u64;
        self.position += 1;

        debug!("Decoded frame {} from {}", index, path.display());
        Ok(Some(FrameData::at_rate(
            index,
            self.fps.unwrap_or(0.0),
            image,
        )))
    }

    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.files.len() as u64)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Compare names with digit runs ordered by value
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut a = a.chars().peekable();
    let mut b = b.chars().peekable();

    loop {
        match (a.peek().copied(), b.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let left = take_digits(&mut a);
                let right = take_digits(&mut b);
                let left_trimmed = left.trim_start_matches('0');
                let right_trimmed = right.trim_start_matches('0');
                let ordering = left_trimmed
                    .len()
                    .cmp(&right_trimmed.len())
                    .then_with(|| left_trimmed.cmp(right_trimmed))
                    .then_with(|| left.len().cmp(&right.len()));
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(x), Some(y)) => {
                if x != y {
                    return x.cmp(&y);
                }
                a.next();
                b.next();
            }
        }
    }
}

fn take_digits(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

/// Writes each frame as `frame_NNNNNN.<ext>` into a directory
pub struct ImageSequenceSink {
    dir: PathBuf,
    format: ImageFormat,
    extension: String,
    frames_written: u64,
    closed: bool,
}

impl ImageSequenceSink {
    pub fn create<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Self, VideoError> {
        let dir = dir.as_ref().to_path_buf();
        let format = ImageFormat::from_extension(extension).ok_or_else(|| {
            VideoError::Unsupported {
                details: format!("unknown image format '{}'", extension),
            }
        })?;

        fs::create_dir_all(&dir).map_err(|e| VideoError::Open {
            path: dir.display().to_string(),
            details: e.to_string(),
        })?;

        Ok(Self {
            dir,
            format,
            extension: extension.to_ascii_lowercase(),
            frames_written: 0,
            closed: false,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl VideoSink for ImageSequenceSink {
    fn write_frame(&mut self, frame: &FrameData) -> Result<(), VideoError> {
        if self.closed {
            return Err(VideoError::Write {
                details: "sink already closed".to_string(),
            });
        }

        let path = self
            .dir
            .join(format!("frame_{:06}.{}", frame.index, self.extension));
        frame
            .image
            .save_with_format(&path, self.format)
            .map_err(|e| VideoError::Write {
                details: format!("{}: {}", path.display(), e),
            })?;

        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        if !self.closed {
            self.closed = true;
            info!(
                "Wrote {} frames to {}",
                self.frames_written,
                self.dir.display()
            );
        }
        Ok(())
    }
}
