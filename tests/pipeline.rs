// 该文件是 Toukui （头盔巡查） 项目的一部分。
// tests/pipeline.rs - 流水线集成测试
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::collections::{HashMap, HashSet, VecDeque};
use std::convert::Infallible;
use std::path::PathBuf;

use image::{GrayImage, RgbImage};

use toukui::{
  config::{DetectorErrorPolicy, PipelineConfig},
  frame::Frame,
  input::{FrameSource, InputError},
  model::{DetectedObject, TrackOptions, Tracker},
  ocr::PlateReader,
  output::EvidenceSink,
  pipeline::{PipelineError, PlateText, RunReport, RunStatus, ViolationPipeline, ViolationRecord},
};

struct FakeSource {
  frames: VecDeque<Frame>,
  fps: f64,
  width: u32,
  height: u32,
}

impl FakeSource {
  fn new(count: u64, width: u32, height: u32, fps: f64) -> Self {
    Self {
      frames: (1..=count)
        .map(|index| Frame::new(RgbImage::new(width, height), index))
        .collect(),
      fps,
      width,
      height,
    }
  }
}

impl Iterator for FakeSource {
  type Item = Result<Frame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    self.frames.pop_front().map(Ok)
  }
}

impl FrameSource for FakeSource {
  fn fps(&self) -> f64 {
    self.fps
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}

/// 按帧序号给出预设检测结果，并记录被调用的帧
#[derive(Default)]
struct SpyTracker {
  script: HashMap<u64, Vec<DetectedObject>>,
  failing: HashSet<u64>,
  calls: Vec<u64>,
  options: Vec<TrackOptions>,
}

impl SpyTracker {
  fn on(mut self, frame: u64, objects: Vec<DetectedObject>) -> Self {
    self.script.insert(frame, objects);
    self
  }

  fn fail_on(mut self, frame: u64) -> Self {
    self.failing.insert(frame);
    self
  }
}

impl Tracker for SpyTracker {
  type Error = std::io::Error;

  fn track(
    &mut self,
    frame: &Frame,
    options: &TrackOptions,
  ) -> Result<Vec<DetectedObject>, Self::Error> {
    self.calls.push(frame.index);
    self.options.push(*options);
    if self.failing.contains(&frame.index) {
      return Err(std::io::Error::other("inference failed"));
    }
    Ok(self.script.get(&frame.index).cloned().unwrap_or_default())
  }
}

struct ScriptedReader {
  reply: Result<Vec<String>, String>,
  crops: Vec<(u32, u32)>,
}

impl ScriptedReader {
  fn text(text: &str) -> Self {
    Self {
      reply: Ok(vec![text.to_string()]),
      crops: Vec::new(),
    }
  }

  fn failing() -> Self {
    Self {
      reply: Err("engine crashed".to_string()),
      crops: Vec::new(),
    }
  }
}

impl PlateReader for ScriptedReader {
  type Error = String;

  fn read_lines(&mut self, crop: &GrayImage) -> Result<Vec<String>, Self::Error> {
    self.crops.push(crop.dimensions());
    self.reply.clone()
  }
}

#[derive(Default)]
struct MemorySink {
  evidence: Vec<String>,
  records: Vec<ViolationRecord>,
  finished: Option<RunStatus>,
}

impl EvidenceSink for MemorySink {
  type Error = Infallible;

  fn write_evidence(&mut self, name: &str, _image: &RgbImage) -> Result<PathBuf, Self::Error> {
    self.evidence.push(name.to_string());
    Ok(PathBuf::from("evidence").join(name))
  }

  fn append_record(&mut self, record: &ViolationRecord) -> Result<(), Self::Error> {
    self.records.push(record.clone());
    Ok(())
  }

  fn finish(&mut self, report: &RunReport) -> Result<(), Self::Error> {
    self.finished = Some(report.status());
    Ok(())
  }
}

fn rider(track_id: Option<u64>, bbox: [f32; 4]) -> DetectedObject {
  DetectedObject {
    class_id: 1,
    confidence: 0.9,
    bbox: bbox.into(),
    track_id,
  }
}

fn helmeted(track_id: u64) -> DetectedObject {
  DetectedObject {
    class_id: 0,
    confidence: 0.9,
    bbox: [0.0, 0.0, 10.0, 10.0].into(),
    track_id: Some(track_id),
  }
}

fn config(stride: u64) -> PipelineConfig {
  PipelineConfig {
    sample_stride: stride,
    ..Default::default()
  }
}

#[test]
fn end_to_end_single_violation() {
  let tracker = SpyTracker::default()
    .on(6, vec![rider(Some(7), [10.0, 10.0, 30.0, 40.0])])
    .on(9, vec![rider(Some(7), [12.0, 10.0, 32.0, 40.0])]);
  let mut pipeline =
    ViolationPipeline::new(config(3), tracker, ScriptedReader::text("KA01AB1234")).unwrap();
  let mut source = FakeSource::new(10, 64, 48, 30.0);
  let mut sink = MemorySink::default();

  let report = pipeline.run(&mut source, &mut sink).unwrap();

  assert_eq!(report.records.len(), 1);
  let record = &report.records[0];
  assert_eq!(record.track_id, 7);
  assert_eq!(record.frame_index, 6);
  assert_eq!(record.timestamp.to_string(), "0:00:00");
  assert_eq!(record.violation.to_string(), "No Helmet");
  assert_eq!(record.plate_text, PlateText::Recognized("KA01AB1234".to_string()));
  assert_eq!(record.evidence, PathBuf::from("evidence/violation_ID7_6.jpg"));
  assert_eq!(sink.evidence, vec!["violation_ID7_6.jpg".to_string()]);
  assert_eq!(sink.records, report.records);
  assert_eq!(report.status(), RunStatus::Violations(1));
  assert_eq!(sink.finished, Some(RunStatus::Violations(1)));
  assert_eq!(report.frames_read, 10);
  assert_eq!(report.frames_sampled, 3);
}

#[test]
fn track_id_is_recorded_at_most_once() {
  let mut tracker = SpyTracker::default();
  for frame in (3..=60).step_by(3) {
    tracker = tracker.on(frame, vec![rider(Some(7), [0.0, 0.0, 20.0, 20.0])]);
  }
  tracker = tracker.on(
    12,
    vec![
      rider(Some(7), [0.0, 0.0, 20.0, 20.0]),
      rider(Some(8), [30.0, 0.0, 50.0, 20.0]),
    ],
  );
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();
  let mut sink = MemorySink::default();

  let report = pipeline
    .run(&mut FakeSource::new(60, 64, 48, 30.0), &mut sink)
    .unwrap();

  let ids: Vec<u64> = report.records.iter().map(|r| r.track_id).collect();
  assert_eq!(ids, vec![7, 8]);
  assert_eq!(sink.evidence.len(), 2);
}

#[test]
fn untracked_and_helmeted_riders_are_ignored() {
  let tracker = SpyTracker::default()
    .on(3, vec![rider(None, [0.0, 0.0, 20.0, 20.0]), helmeted(4)])
    .on(6, vec![rider(None, [0.0, 0.0, 20.0, 20.0])]);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();
  let mut sink = MemorySink::default();

  let report = pipeline
    .run(&mut FakeSource::new(9, 64, 48, 30.0), &mut sink)
    .unwrap();

  assert!(report.records.is_empty());
  assert!(sink.evidence.is_empty());
}

#[test]
fn plate_region_is_cropped_below_rider() {
  let tracker = SpyTracker::default().on(1, vec![rider(Some(1), [100.0, 100.0, 200.0, 300.0])]);
  let mut pipeline = ViolationPipeline::new(config(1), tracker, ScriptedReader::text("ABCD")).unwrap();

  pipeline
    .run(&mut FakeSource::new(1, 640, 480, 30.0), &mut MemorySink::default())
    .unwrap();

  // (50, 300, 250, 480)
  assert_eq!(pipeline.reader().crops, vec![(200, 180)]);
}

#[test]
fn short_plate_text_is_not_visible() {
  for text in ["A", "AB", "XYZ"] {
    let tracker = SpyTracker::default().on(3, vec![rider(Some(1), [0.0, 0.0, 20.0, 20.0])]);
    let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text(text)).unwrap();
    let report = pipeline
      .run(&mut FakeSource::new(3, 64, 48, 30.0), &mut MemorySink::default())
      .unwrap();
    assert_eq!(report.records[0].plate_text, PlateText::NotVisible);
    assert_eq!(report.records[0].plate_text.to_string(), "Not Visible");
  }
}

#[test]
fn recognizer_failure_does_not_abort() {
  let tracker = SpyTracker::default()
    .on(3, vec![rider(Some(1), [0.0, 0.0, 20.0, 20.0])])
    .on(6, vec![rider(Some(2), [0.0, 0.0, 20.0, 20.0])]);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::failing()).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(6, 64, 48, 30.0), &mut MemorySink::default())
    .unwrap();

  assert_eq!(report.records.len(), 2);
  assert!(report.records.iter().all(|r| r.plate_text == PlateText::Failed));
}

#[test]
fn rider_at_frame_bottom_skips_recognizer() {
  let tracker = SpyTracker::default().on(3, vec![rider(Some(1), [10.0, 20.0, 30.0, 48.0])]);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(3, 64, 48, 30.0), &mut MemorySink::default())
    .unwrap();

  assert_eq!(report.records[0].plate_text, PlateText::Unknown);
  assert!(pipeline.reader().crops.is_empty());
}

#[test]
fn timestamp_follows_frame_index_and_fps() {
  let tracker = SpyTracker::default().on(90, vec![rider(Some(3), [0.0, 0.0, 10.0, 10.0])]);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(90, 16, 16, 30.0), &mut MemorySink::default())
    .unwrap();

  assert_eq!(report.records[0].timestamp.to_string(), "0:00:03");
}

#[test]
fn only_stride_frames_reach_detector() {
  for (total, stride) in [(10, 3), (9, 3), (2, 3), (7, 1), (25, 5)] {
    let mut pipeline =
      ViolationPipeline::new(config(stride), SpyTracker::default(), ScriptedReader::text("ABCD")).unwrap();
    pipeline
      .run(&mut FakeSource::new(total, 8, 8, 30.0), &mut MemorySink::default())
      .unwrap();

    let calls = &pipeline.tracker().calls;
    assert_eq!(calls.len() as u64, total / stride, "total={total} stride={stride}");
    assert!(calls.iter().all(|index| index % stride == 0));
    assert!(pipeline.tracker().options.iter().all(|o| o.persist));
  }
}

#[test]
fn no_violations_is_a_distinct_status() {
  let tracker = SpyTracker::default().on(3, vec![helmeted(1)]);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();
  let mut sink = MemorySink::default();

  let report = pipeline
    .run(&mut FakeSource::new(12, 8, 8, 30.0), &mut sink)
    .unwrap();

  assert!(report.records.is_empty());
  assert_eq!(report.status(), RunStatus::NoViolations);
  assert_eq!(sink.finished, Some(RunStatus::NoViolations));
}

#[test]
fn empty_source_produces_no_report() {
  let mut pipeline =
    ViolationPipeline::new(config(3), SpyTracker::default(), ScriptedReader::text("ABCD")).unwrap();
  let mut sink = MemorySink::default();

  let result = pipeline.run(&mut FakeSource::new(0, 8, 8, 30.0), &mut sink);

  assert!(matches!(result, Err(PipelineError::EmptySource)));
  assert!(sink.finished.is_none());
}

#[test]
fn invalid_source_fps_is_rejected() {
  let mut pipeline =
    ViolationPipeline::new(config(3), SpyTracker::default(), ScriptedReader::text("ABCD")).unwrap();
  let result = pipeline.run(&mut FakeSource::new(6, 8, 8, 0.0), &mut MemorySink::default());
  assert!(matches!(result, Err(PipelineError::InvalidFrameRate(_))));
  assert!(pipeline.tracker().calls.is_empty());
}

#[test]
fn fps_override_replaces_source_rate() {
  let tracker = SpyTracker::default().on(30, vec![rider(Some(1), [0.0, 0.0, 4.0, 4.0])]);
  let config = PipelineConfig {
    fps_override: Some(10.0),
    ..config(3)
  };
  let mut pipeline = ViolationPipeline::new(config, tracker, ScriptedReader::text("ABCD")).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(30, 8, 8, 0.0), &mut MemorySink::default())
    .unwrap();

  assert_eq!(report.records[0].timestamp.to_string(), "0:00:03");
}

#[test]
fn detector_failure_aborts_by_default() {
  let tracker = SpyTracker::default().fail_on(6);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();
  let mut sink = MemorySink::default();

  let result = pipeline.run(&mut FakeSource::new(12, 8, 8, 30.0), &mut sink);

  assert!(matches!(result, Err(PipelineError::Detector { frame: 6, .. })));
  assert_eq!(pipeline.tracker().calls, vec![3, 6]);
  assert!(sink.finished.is_none());
}

#[test]
fn detector_failure_can_skip_frame() {
  let tracker = SpyTracker::default()
    .fail_on(6)
    .on(9, vec![rider(Some(5), [0.0, 0.0, 4.0, 4.0])]);
  let config = PipelineConfig {
    detector_errors: DetectorErrorPolicy::SkipFrame,
    ..config(3)
  };
  let mut pipeline = ViolationPipeline::new(config, tracker, ScriptedReader::text("ABCD")).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(12, 8, 8, 30.0), &mut MemorySink::default())
    .unwrap();

  assert_eq!(report.frames_skipped, 1);
  assert_eq!(report.records.len(), 1);
  assert_eq!(pipeline.tracker().calls, vec![3, 6, 9, 12]);
}

#[test]
fn max_frames_stops_early() {
  let config = PipelineConfig {
    max_frames: Some(7),
    ..config(3)
  };
  let mut pipeline =
    ViolationPipeline::new(config, SpyTracker::default(), ScriptedReader::text("ABCD")).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(30, 8, 8, 30.0), &mut MemorySink::default())
    .unwrap();

  assert_eq!(report.frames_read, 7);
  assert_eq!(pipeline.tracker().calls, vec![3, 6]);
}

#[test]
fn processed_ids_do_not_leak_between_runs() {
  let tracker = SpyTracker::default().on(3, vec![rider(Some(7), [0.0, 0.0, 4.0, 4.0])]);
  let mut pipeline = ViolationPipeline::new(config(3), tracker, ScriptedReader::text("ABCD")).unwrap();

  for _ in 0..2 {
    let report = pipeline
      .run(&mut FakeSource::new(3, 8, 8, 30.0), &mut MemorySink::default())
      .unwrap();
    assert_eq!(report.records.len(), 1);
  }
}

#[test]
fn zero_stride_is_rejected() {
  let result = ViolationPipeline::new(config(0), SpyTracker::default(), ScriptedReader::text("ABCD"));
  assert!(matches!(result, Err(PipelineError::Config(_))));
}

#[test]
fn replayed_low_confidence_riders_are_not_recorded() {
  let tracks = r#"{"frame": 3, "objects": [{"class_id": 1, "confidence": 0.45, "bbox": [0, 0, 4, 4], "track_id": 7}]}
{"frame": 6, "objects": [{"class_id": 1, "confidence": 0.55, "bbox": [0, 0, 4, 4], "track_id": 8}]}"#;
  let tracker = toukui::model::ReplayTracker::from_reader(tracks.as_bytes()).unwrap();
  let mut pipeline =
    ViolationPipeline::new(PipelineConfig::default(), tracker, ScriptedReader::text("ABCD")).unwrap();

  let report = pipeline
    .run(&mut FakeSource::new(6, 8, 8, 30.0), &mut MemorySink::default())
    .unwrap();

  let ids: Vec<u64> = report.records.iter().map(|r| r.track_id).collect();
  assert_eq!(ids, vec![8]);
}
