use super::*;
use crate::{
    detector::PoseDetector,
    error::{DancecamError, DetectionError, PipelineError, VideoError},
    frame::FrameData,
    motion::DominantLimb,
    pose::{Detection, Joint, Keypoint},
    video::{VideoSink, VideoSource},
};
use image::{Rgb, RgbImage};

enum Script {
    Pose(Vec<(Joint, f64, f64)>),
    NoPose,
    Fail,
}

struct ScriptedDetector {
    script: Vec<Script>,
}

impl PoseDetector for ScriptedDetector {
    fn detect(&mut self, frame: &FrameData) -> Result<Detection, DetectionError> {
        match self.script.get(frame.index as usize) {
            Some(Script::Pose(joints)) => Ok(joints
                .iter()
                .map(|(joint, x, y)| (*joint, Keypoint::new(*x, *y, 0.9)))
                .collect()),
            Some(Script::NoPose) | None => Ok(Detection::empty()),
            Some(Script::Fail) => Err(DetectionError::MalformedInput {
                frame_index: frame.index,
                details: "corrupt frame".to_string(),
            }),
        }
    }
}

struct MemorySource {
    frames: std::vec::IntoIter<FrameData>,
    count: u64,
    fail_at: Option<u64>,
    read: u64,
}

impl MemorySource {
    fn new(count: u64) -> Self {
        let frames: Vec<FrameData> = (0..count)
            .map(|i| {
                let image = RgbImage::from_fn(32, 24, |x, y| Rgb([x as u8, y as u8, i as u8]));
                FrameData::at_rate(i, 10.0, image)
            })
            .collect();
        Self {
            frames: frames.into_iter(),
            count,
            fail_at: None,
            read: 0,
        }
    }

    fn failing_at(mut self, index: u64) -> Self {
        self.fail_at = Some(index);
        self
    }
}

impl VideoSource for MemorySource {
    fn next_frame(&mut self) -> Result<Option<FrameData>, VideoError> {
        if self.fail_at == Some(self.read) {
            return Err(VideoError::Read {
                details: "truncated stream".to_string(),
            });
        }
        self.read += 1;
        Ok(self.frames.next())
    }

    fn frame_rate(&self) -> Option<f64> {
        Some(10.0)
    }

    fn frame_count_hint(&self) -> Option<u64> {
        Some(self.count)
    }
}

#[derive(Default)]
struct MemorySink {
    frames: Vec<FrameData>,
    fail_at: Option<u64>,
    fail_close: bool,
    close_calls: u32,
}

impl VideoSink for MemorySink {
    fn write_frame(&mut self, frame: &FrameData) -> Result<(), VideoError> {
        if self.fail_at == Some(frame.index) {
            return Err(VideoError::Write {
                details: "disk full".to_string(),
            });
        }
        self.frames.push(frame.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        self.close_calls += 1;
        if self.fail_close {
            return Err(VideoError::Encoding {
                details: "muxer failed".to_string(),
            });
        }
        Ok(())
    }
}

fn pose(offset: f64) -> Script {
    Script::Pose(vec![
        (Joint::LeftWrist, 0.2 + offset, 0.5),
        (Joint::LeftElbow, 0.3, 0.4),
        (Joint::RightWrist, 0.8, 0.5),
        (Joint::RightElbow, 0.7, 0.4),
    ])
}

fn pipeline(script: Vec<Script>) -> AnalysisPipeline {
    AnalysisPipelineBuilder::new()
        .detector(ScriptedDetector { script })
        .frame_labels(false)
        .build()
        .unwrap()
}

#[test]
fn test_identical_positions_report_zero_motion() {
    let mut pipeline = pipeline((0..10).map(|_| pose(0.0)).collect());
    let mut source = MemorySource::new(10);
    let mut sink = MemorySink::default();

    let report = pipeline.analyze(&mut source, &mut sink).unwrap();

    assert_eq!(report.frames_processed, 10);
    assert_eq!(report.frames_with_pose, 10);
    assert_eq!(report.avg_movement_intensity, 0.0);
    assert_eq!(report.dominant_limb, DominantLimb::Balanced);
    assert_eq!(sink.frames.len(), 10);
    assert_eq!(sink.close_calls, 1);
    assert_eq!(pipeline.state(), PipelineState::Done);
}

#[test]
fn test_alternating_detection_has_no_adjacent_pairs() {
    let script = vec![
        pose(0.0),
        Script::NoPose,
        pose(0.2),
        Script::NoPose,
        pose(0.4),
    ];
    let mut pipeline = pipeline(script);
    let report = pipeline
        .analyze(&mut MemorySource::new(5), &mut MemorySink::default())
        .unwrap();

    assert_eq!(report.frames_processed, 5);
    assert_eq!(report.frames_with_pose, 3);
    assert_eq!(report.avg_movement_intensity, 0.0);
    assert_eq!(report.dominant_limb, DominantLimb::Balanced);
}

#[test]
fn test_single_frame_video() {
    let mut pipeline = pipeline(vec![pose(0.0)]);
    let report = pipeline
        .analyze(&mut MemorySource::new(1), &mut MemorySink::default())
        .unwrap();

    assert_eq!(report.frames_processed, 1);
    assert_eq!(report.frames_with_pose, 1);
    assert_eq!(report.avg_movement_intensity, 0.0);
}

#[test]
fn test_empty_video_completes_with_zero_report() {
    let mut pipeline = pipeline(Vec::new());
    let mut sink = MemorySink::default();
    let report = pipeline.analyze(&mut MemorySource::new(0), &mut sink).unwrap();

    assert_eq!(report.frames_processed, 0);
    assert_eq!(report.frames_with_pose, 0);
    assert_eq!(report.avg_movement_intensity, 0.0);
    assert_eq!(report.dominant_limb, DominantLimb::Balanced);
    assert_eq!(sink.close_calls, 1);
}

#[test]
fn test_moving_left_wrist() {
    let mut pipeline = pipeline((0..4).map(|i| pose(i as f64 * 0.1)).collect());
    let report = pipeline
        .analyze(&mut MemorySource::new(4), &mut MemorySink::default())
        .unwrap();

    // Each pair: wrist moves 0.1, three joints still
    assert!((report.avg_movement_intensity - 0.025).abs() < 1e-9);
    assert_eq!(report.dominant_limb, DominantLimb::Left);
}

#[test]
fn test_detector_failure_is_not_fatal() {
    let script = vec![pose(0.0), Script::Fail, pose(0.1), pose(0.2)];
    let mut pipeline = pipeline(script);
    let mut sink = MemorySink::default();
    let report = pipeline.analyze(&mut MemorySource::new(4), &mut sink).unwrap();

    assert_eq!(report.frames_processed, 4);
    assert_eq!(report.frames_with_pose, 3);
    assert_eq!(sink.frames.len(), 4);
    // Only the (2, 3) pair contributes
    assert!((report.avg_movement_intensity - 0.025).abs() < 1e-9);
}

#[test]
fn test_source_failure_aborts_with_frame_index() {
    let mut pipeline = pipeline((0..6).map(|_| pose(0.0)).collect());
    let mut source = MemorySource::new(6).failing_at(3);
    let mut sink = MemorySink::default();

    let err = pipeline.analyze(&mut source, &mut sink).unwrap_err();
    match err {
        DancecamError::Pipeline(PipelineError::SourceRead { frame_index, .. }) => {
            assert_eq!(frame_index, 3)
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(sink.frames.len(), 3);
    assert_eq!(sink.close_calls, 1);
    assert_eq!(pipeline.state(), PipelineState::Failed);
}

#[test]
fn test_source_failure_on_first_frame() {
    let mut pipeline = pipeline(Vec::new());
    let mut source = MemorySource::new(3).failing_at(0);
    let err = pipeline
        .analyze(&mut source, &mut MemorySink::default())
        .unwrap_err();
    assert!(matches!(
        err,
        DancecamError::Pipeline(PipelineError::SourceRead { frame_index: 0, .. })
    ));
}

#[test]
fn test_sink_failure_aborts() {
    let mut pipeline = pipeline((0..5).map(|_| pose(0.0)).collect());
    let mut sink = MemorySink {
        fail_at: Some(2),
        ..MemorySink::default()
    };

    let err = pipeline
        .analyze(&mut MemorySource::new(5), &mut sink)
        .unwrap_err();
    match err {
        DancecamError::Pipeline(e @ PipelineError::SinkWrite { .. }) => {
            assert_eq!(e.frame_index(), 2)
        }
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(sink.close_calls, 1);
}

#[test]
fn test_sink_close_failure_is_reported() {
    let mut pipeline = pipeline((0..3).map(|_| pose(0.0)).collect());
    let mut sink = MemorySink {
        fail_close: true,
        ..MemorySink::default()
    };

    let err = pipeline
        .analyze(&mut MemorySource::new(3), &mut sink)
        .unwrap_err();
    assert!(matches!(
        err,
        DancecamError::Pipeline(PipelineError::SinkClose {
            frames_written: 3,
            ..
        })
    ));
    assert_eq!(sink.close_calls, 1);
}

#[test]
fn test_rerun_is_deterministic() {
    let script = || {
        vec![
            pose(0.0),
            pose(0.05),
            Script::NoPose,
            pose(0.1),
            pose(0.3),
            Script::Fail,
            pose(0.2),
        ]
    };

    let mut first_sink = MemorySink::default();
    let first = pipeline(script())
        .analyze(&mut MemorySource::new(7), &mut first_sink)
        .unwrap();

    let mut reused = pipeline(script());
    let mut second_sink = MemorySink::default();
    let second = reused
        .analyze(&mut MemorySource::new(7), &mut MemorySink::default())
        .unwrap();
    let third = reused
        .analyze(&mut MemorySource::new(7), &mut second_sink)
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(second, third);
    let first_images: Vec<_> = first_sink.frames.iter().map(|f| f.image.clone()).collect();
    let third_images: Vec<_> = second_sink.frames.iter().map(|f| f.image.clone()).collect();
    assert_eq!(first_images, third_images);
}

#[test]
fn test_undetected_frames_pass_through_unchanged() {
    let mut pipeline = pipeline(vec![Script::NoPose, pose(0.0)]);
    let mut sink = MemorySink::default();
    let mut reference = MemorySource::new(2);
    let originals: Vec<FrameData> = std::iter::from_fn(|| reference.next_frame().unwrap()).collect();

    pipeline.analyze(&mut MemorySource::new(2), &mut sink).unwrap();

    assert_eq!(sink.frames[0].image, originals[0].image);
    assert_ne!(sink.frames[1].image, originals[1].image);
}

#[test]
fn test_max_frames_stops_early() {
    let mut pipeline = AnalysisPipelineBuilder::new()
        .detector(ScriptedDetector {
            script: (0..10).map(|i| pose(i as f64 * 0.01)).collect(),
        })
        .pipeline_config(crate::config::PipelineConfig {
            max_frames: Some(4),
            target_fps: None,
        })
        .frame_labels(false)
        .build()
        .unwrap();

    let mut source = MemorySource::new(10);
    let mut sink = MemorySink::default();
    let report = pipeline.analyze(&mut source, &mut sink).unwrap();

    assert_eq!(report.frames_processed, 4);
    assert_eq!(sink.frames.len(), 4);
    assert_eq!(source.read, 4);
}

#[test]
fn test_builder_requires_detector() {
    assert!(matches!(
        AnalysisPipelineBuilder::new().build(),
        Err(DancecamError::Component { .. })
    ));
}

#[tokio::test]
async fn test_concurrent_runs_are_independent() {
    let mut handles = Vec::new();
    for run in 0..4u64 {
        handles.push(tokio::task::spawn_blocking(move || {
            let script = (0..8)
                .map(|i| if i % 3 == 2 { Script::NoPose } else { pose(i as f64 * 0.02) })
                .collect();
            let mut pipeline = pipeline(script);
            let mut sink = MemorySink::default();
            let report = pipeline
                .analyze(&mut MemorySource::new(8), &mut sink)
                .unwrap();
            (run, report, sink.frames.len())
        }));
    }

    let mut reports = Vec::new();
    for handle in handles {
        let (_, report, written) = handle.await.unwrap();
        assert_eq!(written, 8);
        reports.push(report);
    }

    assert!(reports.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(reports[0].frames_with_pose, 6);
    assert!(reports[0].frames_with_pose <= reports[0].frames_processed);
}
