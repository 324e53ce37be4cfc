use crate::error::VideoError;
use crate::frame::FrameData;
use crate::video::{VideoSink, VideoSource};
use gstreamer::prelude::*;
use gstreamer::{ClockTime, Pipeline};
use gstreamer_app::{AppSink, AppSrc};
use gstreamer_video::{VideoFormat, VideoInfo};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

const PREROLL_TIMEOUT_SECS: u64 = 10;
const EOS_TIMEOUT_SECS: u64 = 30;

fn init() -> Result<(), VideoError> {
    gstreamer::init().map_err(|e| VideoError::Unsupported {
        details: format!("Failed to initialize GStreamer: {}", e),
    })
}

/// Pop the first pending error message from the pipeline bus, if any
fn bus_error(pipeline: &Pipeline) -> Option<String> {
    let bus = pipeline.bus()?;
    let msg = bus.pop_filtered(&[gstreamer::MessageType::Error])?;
    match msg.view() {
        gstreamer::MessageView::Error(err) => Some(format!(
            "{} ({})",
            err.error(),
            err.debug().unwrap_or_default()
        )),
        _ => None,
    }
}

/// Decodes any container GStreamer's `decodebin` understands into RGB frames
pub struct GstVideoSource {
    path: PathBuf,
    pipeline: Pipeline,
    appsink: AppSink,
    fps: Option<f64>,
    frame_count: Option<u64>,
    next_index: u64,
    finished: bool,
}

impl GstVideoSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, VideoError> {
        let path = path.as_ref().to_path_buf();
        let open_err = |details: String| VideoError::Open {
            path: path.display().to_string(),
            details,
        };

        if !path.is_file() {
            return Err(open_err("file not found".to_string()));
        }

        init()?;

        let pipeline_desc = "filesrc name=src ! decodebin ! videoconvert ! \
             video/x-raw,format=RGB ! \
             appsink name=sink sync=false max-buffers=2 drop=false";

        debug!("Creating decode pipeline: {}", pipeline_desc);

        let pipeline = gstreamer::parse::launch(pipeline_desc)
            .map_err(|e| open_err(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| open_err("Failed to downcast to Pipeline".to_string()))?;

        let filesrc = pipeline
            .by_name("src")
            .ok_or_else(|| open_err("Failed to get filesrc element".to_string()))?;
        filesrc.set_property("location", path.to_string_lossy().to_string());

        let appsink = pipeline
            .by_name("sink")
            .ok_or_else(|| open_err("Failed to get appsink element".to_string()))?
            .downcast::<AppSink>()
            .map_err(|_| open_err("Failed to downcast to AppSink".to_string()))?;

        pipeline
            .set_state(gstreamer::State::Paused)
            .map_err(|e| open_err(format!("Failed to preroll pipeline: {}", e)))?;

        let (result, _, _) = pipeline.state(ClockTime::from_seconds(PREROLL_TIMEOUT_SECS));
        if let Err(e) = result {
            let details = bus_error(&pipeline).unwrap_or_else(|| e.to_string());
            let _ = pipeline.set_state(gstreamer::State::Null);
            return Err(open_err(details));
        }

        let mut fps = None;
        let mut finished = false;
        match appsink.pull_preroll() {
            Ok(sample) => {
                if let Some(info) = sample.caps().and_then(|caps| VideoInfo::from_caps(caps).ok()) {
                    let rate = info.fps();
                    if rate.numer() > 0 && rate.denom() > 0 {
                        fps = Some(rate.numer() as f64 / rate.denom() as f64);
                    }
                }
            }
            Err(_) if appsink.is_eos() => {
                info!("{} contains no video frames", path.display());
                finished = true;
            }
            Err(e) => {
                let details = bus_error(&pipeline).unwrap_or_else(|| e.to_string());
                let _ = pipeline.set_state(gstreamer::State::Null);
                return Err(open_err(details));
            }
        }

        let frame_count = match (pipeline.query_duration::<ClockTime>(), fps) {
            (Some(duration), Some(fps)) => {
                Some((duration.nseconds() as f64 / 1e9 * fps).round() as u64)
            }
            _ => None,
        };

        pipeline.set_state(gstreamer::State::Playing).map_err(|e| {
            let _ = pipeline.set_state(gstreamer::State::Null);
            open_err(format!("Failed to start pipeline: {}", e))
        })?;

        info!(
            "Opened video {} (fps: {:?}, frames: {:?})",
            path.display(),
            fps,
            frame_count
        );

        Ok(Self {
            path,
            pipeline,
            appsink,
            fps,
            frame_count,
            next_index: 0,
            finished,
        })
    }

    fn sample_to_frame(&self, sample: &gstreamer::Sample) -> Result<FrameData, VideoError> {
        let read_err = |details: &str| VideoError::Read {
            details: format!("{}: {}", self.path.display(), details),
        };

        let caps = sample.caps().ok_or_else(|| read_err("sample without caps"))?;
        let info = VideoInfo::from_caps(caps).map_err(|e| read_err(&e.to_string()))?;
        let buffer = sample.buffer().ok_or_else(|| read_err("sample without buffer"))?;
        let map = buffer.map_readable().map_err(|e| read_err(&e.to_string()))?;

        let width = info.width();
        let height = info.height();
        let stride = info.stride()[0] as usize;
        let row_bytes = width as usize * 3;
        let data = map.as_slice();

        if height == 0 || stride < row_bytes || data.len() < stride * (height as usize - 1) + row_bytes {
            return Err(read_err("buffer smaller than frame"));
        }

        let mut pixels = Vec::with_capacity(row_bytes * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_bytes]);
        }

        let image = RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| read_err("failed to build RGB image"))?;

        let timestamp = match buffer.pts() {
            Some(pts) => Duration::from_nanos(pts.nseconds()),
            None => match self.fps {
                Some(fps) if fps > 0.0 => Duration::from_secs_f64(self.next_index as f64 / fps),
                _ => Duration::ZERO,
            },
        };

        Ok(FrameData::new(self.next_index, timestamp, image))
    }
}

impl VideoSource for GstVideoSource {
    fn next_frame(&mut self) -> Result<Option<FrameData>, VideoError> {
        if self.finished {
            return Ok(None);
        }

        match self.appsink.pull_sample() {
            Ok(sample) => {
                let frame = self.sample_to_frame(&sample)?;
                self.next_index += 1;
                Ok(Some(frame))
            }
            Err(e) => {
                if let Some(details) = bus_error(&self.pipeline) {
                    return Err(VideoError::Read { details });
                }
                if self.appsink.is_eos() {
                    debug!("End of stream after {} frames", self.next_index);
                    self.finished = true;
                    return Ok(None);
                }
                Err(VideoError::Read {
                    details: format!("Failed to pull sample: {}", e),
                })
            }
        }
    }

    fn frame_rate(&self) -> Option<f64> {
        self.fps
    }

    fn frame_count_hint(&self) -> Option<u64> {
        self.frame_count
    }
}

impl Drop for GstVideoSource {
    fn drop(&mut self) {
        if let Err(e) = self.pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop decode pipeline cleanly: {}", e);
        }
    }
}

/// Encodes RGB frames to H.264 in an MP4 container
pub struct GstVideoSink {
    path: PathBuf,
    fps: f64,
    pipeline: Option<Pipeline>,
    appsrc: Option<AppSrc>,
    info: Option<VideoInfo>,
    frames_written: u64,
    closed: bool,
}

impl GstVideoSink {
    pub fn create<P: AsRef<Path>>(path: P, fps: f64) -> Result<Self, VideoError> {
        init()?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            fps: if fps > 0.0 { fps } else { 30.0 },
            pipeline: None,
            appsrc: None,
            info: None,
            frames_written: 0,
            closed: false,
        })
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Build the encoder once the frame size is known
    fn start(&mut self, width: u32, height: u32) -> Result<(), VideoError> {
        let enc_err = |details: String| VideoError::Encoding { details };

        let fps = gstreamer::Fraction::new((self.fps * 1000.0).round() as i32, 1000);
        let info = VideoInfo::builder(VideoFormat::Rgb, width, height)
            .fps(fps)
            .build()
            .map_err(|e| enc_err(format!("Invalid video format: {}", e)))?;
        let caps = info
            .to_caps()
            .map_err(|e| enc_err(format!("Failed to build caps: {}", e)))?;

        let pipeline_desc = "appsrc name=src format=time is-live=false ! \
             videoconvert ! video/x-raw,format=I420 ! \
             x264enc speed-preset=medium key-int-max=60 ! \
             h264parse ! mp4mux faststart=true ! \
             filesink name=out";

        info!(
            "Creating encode pipeline for {} ({}x{} @ {:.2} fps)",
            self.path.display(),
            width,
            height,
            self.fps
        );

        let pipeline = gstreamer::parse::launch(pipeline_desc)
            .map_err(|e| enc_err(format!("Failed to create pipeline: {}", e)))?
            .downcast::<Pipeline>()
            .map_err(|_| enc_err("Failed to downcast to Pipeline".to_string()))?;

        pipeline
            .by_name("out")
            .ok_or_else(|| enc_err("Failed to get filesink element".to_string()))?
            .set_property("location", self.path.to_string_lossy().to_string());

        let appsrc = pipeline
            .by_name("src")
            .ok_or_else(|| enc_err("Failed to get appsrc element".to_string()))?
            .downcast::<AppSrc>()
            .map_err(|_| enc_err("Failed to downcast to AppSrc".to_string()))?;

        appsrc.set_caps(Some(&caps));
        appsrc.set_property("format", gstreamer::Format::Time);

        pipeline
            .set_state(gstreamer::State::Playing)
            .map_err(|e| enc_err(format!("Failed to start pipeline: {}", e)))?;

        self.pipeline = Some(pipeline);
        self.appsrc = Some(appsrc);
        self.info = Some(info);
        Ok(())
    }

    /// Signal end of stream and wait for the muxer to finish the file
    fn finish(&self, pipeline: &Pipeline, appsrc: &AppSrc) -> Result<(), VideoError> {
        appsrc.end_of_stream().map_err(|e| VideoError::Encoding {
            details: format!("Failed to signal EOS: {:?}", e),
        })?;

        let bus = pipeline.bus().ok_or_else(|| VideoError::Encoding {
            details: "Pipeline without bus".to_string(),
        })?;
        for msg in bus.iter_timed(ClockTime::from_seconds(EOS_TIMEOUT_SECS)) {
            match msg.view() {
                gstreamer::MessageView::Eos(..) => {
                    info!(
                        "Video encoding completed: {} frames to {}",
                        self.frames_written,
                        self.path.display()
                    );
                    return Ok(());
                }
                gstreamer::MessageView::Error(err) => {
                    return Err(VideoError::Encoding {
                        details: format!("{} ({})", err.error(), err.debug().unwrap_or_default()),
                    });
                }
                _ => {}
            }
        }

        Err(VideoError::Encoding {
            details: "Timed out waiting for end of stream".to_string(),
        })
    }
}

impl VideoSink for GstVideoSink {
    fn write_frame(&mut self, frame: &FrameData) -> Result<(), VideoError> {
        if self.closed {
            return Err(VideoError::Write {
                details: "sink already closed".to_string(),
            });
        }

        if self.pipeline.is_none() {
            self.start(frame.width(), frame.height())?;
        }

        let (Some(appsrc), Some(info)) = (&self.appsrc, &self.info) else {
            return Err(VideoError::Write {
                details: "encoder not initialized".to_string(),
            });
        };

        if frame.width() != info.width() || frame.height() != info.height() {
            return Err(VideoError::Write {
                details: format!(
                    "frame size {}x{} differs from stream size {}x{}",
                    frame.width(),
                    frame.height(),
                    info.width(),
                    info.height()
                ),
            });
        }

        // Rows are padded to the stride GStreamer expects for RGB
        let stride = info.stride()[0] as usize;
        let row_bytes = frame.width() as usize * 3;
        let mut data = vec![0u8; stride * frame.height() as usize];
        for (row, chunk) in frame.image.as_raw().chunks_exact(row_bytes).enumerate() {
            data[row * stride..row * stride + row_bytes].copy_from_slice(chunk);
        }

        let frame_ns = (1e9 / self.fps) as u64;
        let mut buffer = gstreamer::Buffer::from_mut_slice(data);
        {
            let buffer_ref = buffer.get_mut().ok_or_else(|| VideoError::Write {
                details: "buffer not writable".to_string(),
            })?;
            buffer_ref.set_pts(ClockTime::from_nseconds(self.frames_written * frame_ns));
            buffer_ref.set_duration(ClockTime::from_nseconds(frame_ns));
        }

        appsrc.push_buffer(buffer).map_err(|e| VideoError::Write {
            details: format!("Failed to push buffer: {:?}", e),
        })?;

        self.frames_written += 1;
        if self.frames_written % 30 == 0 {
            debug!("Encoded {} frames", self.frames_written);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let (Some(pipeline), Some(appsrc)) = (self.pipeline.take(), self.appsrc.take()) else {
            debug!("No frames written to {}, nothing to finalize", self.path.display());
            return Ok(());
        };

        let result = self.finish(&pipeline, &appsrc);

        if let Err(e) = pipeline.set_state(gstreamer::State::Null) {
            warn!("Failed to stop encode pipeline cleanly: {}", e);
        }
        result
    }
}

impl Drop for GstVideoSink {
    fn drop(&mut self) {
        if let Some(pipeline) = self.pipeline.take() {
            let _ = pipeline.set_state(gstreamer::State::Null);
        }
    }
}
