// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline.rs - 违规巡查流水线
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

//! 抽帧 → 检测跟踪 → 筛选违规 → 按 ID 去重 → 估算车牌区域 → 识别 → 生成记录。
//!
//! 运行状态只有 `Init → Running → Drained` 三个阶段，不能回退；进入
//! `Drained` 时把运行报告交给输出端。

use std::error::Error as StdError;
use std::num::NonZeroU64;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, error, info, warn};

mod classify;
mod gate;
mod record;
mod region;
mod sampler;
mod timestamp;

pub use self::classify::{Violation, classify_violations};
pub use self::gate::ProcessedIds;
pub use self::record::{
  PlateText, ViolationKind, ViolationRecord, evidence_file_name, recognize_plate,
};
pub use self::region::PlateRegion;
pub use self::sampler::FrameSampler;
pub use self::timestamp::PlaybackTimestamp;

use crate::{
  config::{ConfigError, DetectorErrorPolicy, PipelineConfig, check_fps},
  frame::Frame,
  input::{FrameSource, InputError},
  model::Tracker,
  ocr::PlateReader,
  output::{EvidenceDraw, EvidenceSink},
};

type BoxError = Box<dyn StdError + Send + Sync>;

#[derive(Error, Debug)]
pub enum PipelineError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("输入源没有任何帧")]
  EmptySource,
  #[error("输入源帧率无效: {0}")]
  InvalidFrameRate(f64),
  #[error("读取第 {frame} 帧失败: {source}")]
  Source { frame: u64, source: InputError },
  #[error("第 {frame} 帧检测失败: {source}")]
  Detector { frame: u64, source: BoxError },
  #[error("输出失败: {0}")]
  Sink(BoxError),
}

/// 一次运行的结果
#[derive(Debug, Clone)]
pub struct RunReport {
  pub frames_read: u64,
  pub frames_sampled: u64,
  /// 检测失败后被跳过的抽样帧
  pub frames_skipped: u64,
  pub records: Vec<ViolationRecord>,
  pub started_at: DateTime<Utc>,
  pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
  Violations(usize),
  NoViolations,
}

impl RunReport {
  pub fn status(&self) -> RunStatus {
    match self.records.len() {
      0 => RunStatus::NoViolations,
      n => RunStatus::Violations(n),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Phase {
  Init,
  Running,
  Drained,
}

/// 单次运行的可变状态，随 `run` 创建、随 `run` 结束丢弃
struct RunState {
  phase: Phase,
  processed: ProcessedIds,
  records: Vec<ViolationRecord>,
  frames_read: u64,
  frames_sampled: u64,
  frames_skipped: u64,
  started_at: DateTime<Utc>,
}

impl RunState {
  fn new() -> Self {
    Self {
      phase: Phase::Init,
      processed: ProcessedIds::new(),
      records: Vec::new(),
      frames_read: 0,
      frames_sampled: 0,
      frames_skipped: 0,
      started_at: Utc::now(),
    }
  }

  fn advance(&mut self, next: Phase) {
    debug_assert!(next > self.phase, "{:?} -> {:?}", self.phase, next);
    debug!("流水线状态: {:?} -> {:?}", self.phase, next);
    self.phase = next;
  }

  fn into_report(self) -> RunReport {
    RunReport {
      frames_read: self.frames_read,
      frames_sampled: self.frames_sampled,
      frames_skipped: self.frames_skipped,
      records: self.records,
      started_at: self.started_at,
      finished_at: Utc::now(),
    }
  }
}

fn sink_error<E: StdError + Send + Sync + 'static>(err: E) -> PipelineError {
  PipelineError::Sink(Box::new(err))
}

pub struct ViolationPipeline<T, R> {
  config: PipelineConfig,
  sampler: FrameSampler,
  tracker: T,
  reader: R,
  draw: EvidenceDraw,
}

impl<T, R> ViolationPipeline<T, R>
where
  T: Tracker,
  T::Error: StdError + Send + Sync + 'static,
  R: PlateReader,
{
  pub fn new(config: PipelineConfig, tracker: T, reader: R) -> Result<Self, PipelineError> {
    config.validate()?;
    let stride = NonZeroU64::new(config.sample_stride).ok_or(ConfigError::ZeroStride)?;
    Ok(Self {
      config,
      sampler: FrameSampler::new(stride),
      tracker,
      reader,
      draw: EvidenceDraw::default(),
    })
  }

  pub fn with_draw(mut self, draw: EvidenceDraw) -> Self {
    self.draw = draw;
    self
  }

  pub fn tracker(&self) -> &T {
    &self.tracker
  }

  pub fn reader(&self) -> &R {
    &self.reader
  }

  /// 处理整条帧流。
  ///
  /// 输入源一帧都没有时返回 [`PipelineError::EmptySource`]，此时不会调用
  /// `sink.finish`。没有发现违规不是错误，报告状态为
  /// [`RunStatus::NoViolations`]。
  pub fn run<S, K>(&mut self, source: &mut S, sink: &mut K) -> Result<RunReport, PipelineError>
  where
    S: FrameSource,
    K: EvidenceSink,
  {
    let mut state = RunState::new();
    let options = self.config.track_options();

    let first = match source.next() {
      Some(Ok(frame)) => frame,
      Some(Err(source)) => return Err(PipelineError::Source { frame: 1, source }),
      None => {
        error!("输入源没有任何帧");
        return Err(PipelineError::EmptySource);
      }
    };

    let fps = match self.config.fps_override {
      Some(fps) => fps,
      None => check_fps(source.fps()).map_err(|_| PipelineError::InvalidFrameRate(source.fps()))?,
    };
    info!(
      "开始巡查: {}x{} @ {:.2} fps，每 {} 帧抽 1 帧",
      source.width(),
      source.height(),
      fps,
      self.sampler.stride()
    );
    state.advance(Phase::Running);

    let mut next = Some(Ok(first));
    while let Some(item) = next {
      if self.config.max_frames.is_some_and(|max| state.frames_read >= max) {
        info!("已达到最大帧数限制: {}", state.frames_read);
        break;
      }

      let frame = item.map_err(|source| PipelineError::Source {
        frame: state.frames_read + 1,
        source,
      })?;
      state.frames_read += 1;

      if self.sampler.should_sample(frame.index) {
        state.frames_sampled += 1;
        self.process_frame(&frame, fps, &options, &mut state, sink)?;
      }

      next = source.next();
    }

    debug!("本次运行共记录 {} 个违规轨迹", state.processed.len());
    state.advance(Phase::Drained);
    let report = state.into_report();
    sink.finish(&report).map_err(sink_error)?;

    match report.status() {
      RunStatus::Violations(n) => info!(
        "巡查结束: 读取 {} 帧，抽样 {} 帧，发现 {} 起违规",
        report.frames_read, report.frames_sampled, n
      ),
      RunStatus::NoViolations => info!(
        "巡查结束: 读取 {} 帧，抽样 {} 帧，未发现违规",
        report.frames_read, report.frames_sampled
      ),
    }
    Ok(report)
  }

  fn process_frame<K: EvidenceSink>(
    &mut self,
    frame: &Frame,
    fps: f64,
    options: &crate::model::TrackOptions,
    state: &mut RunState,
    sink: &mut K,
  ) -> Result<(), PipelineError> {
    let objects = match self.tracker.track(frame, options) {
      Ok(objects) => objects,
      Err(err) => match self.config.detector_errors {
        DetectorErrorPolicy::Abort => {
          error!("第 {} 帧检测失败，终止运行: {}", frame.index, err);
          return Err(PipelineError::Detector {
            frame: frame.index,
            source: Box::new(err),
          });
        }
        DetectorErrorPolicy::SkipFrame => {
          warn!("第 {} 帧检测失败，跳过: {}", frame.index, err);
          state.frames_skipped += 1;
          return Ok(());
        }
      },
    };

    let violations = classify_violations(&objects, self.config.violation_class);
    debug!(
      "第 {} 帧: {} 个目标，{} 个违规",
      frame.index,
      objects.len(),
      violations.len()
    );

    for violation in violations {
      if !state.processed.admit(violation.track_id) {
        continue;
      }

      let region = PlateRegion::estimate(
        &violation.bbox,
        frame.width(),
        frame.height(),
        &self.config.plate_region,
      );
      let plate_text = recognize_plate(
        &mut self.reader,
        frame,
        &region,
        self.config.min_plate_chars,
      );
      let timestamp = PlaybackTimestamp::from_frame(frame.index, fps);

      let image = self
        .draw
        .annotate(&frame.image, violation.track_id, &violation.bbox, &region);
      let name = evidence_file_name(violation.track_id, frame.index);
      let evidence = sink.write_evidence(&name, &image).map_err(sink_error)?;

      let record = ViolationRecord {
        track_id: violation.track_id,
        frame_index: frame.index,
        timestamp,
        violation: ViolationKind::NoHelmet,
        plate_text,
        evidence,
      };
      info!(
        track_id = record.track_id,
        time = %record.timestamp,
        plate = %record.plate_text,
        "发现新违规"
      );
      sink.append_record(&record).map_err(sink_error)?;
      state.records.push(record);
    }
    Ok(())
  }
}
