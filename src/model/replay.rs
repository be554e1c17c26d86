// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/model/replay.rs - 跟踪结果回放
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

//! 回放外部跟踪器导出的结果。
//!
//! URL 形如 `replay:///path/to/tracks.jsonl`。文件每行一个 JSON 对象：
//!
//! ```text
//! {"frame": 6, "objects": [{"class_id": 1, "confidence": 0.91, "bbox": [100, 100, 200, 300], "track_id": 7}]}
//! ```
//!
//! `frame` 为从 1 开始的帧序号；没有出现在文件中的帧视为无检测。空行与以 `#`
//! 开头的行被忽略。轨迹 ID 来自文件本身，因此 `persist` 选项不起作用；
//! 置信度低于跟踪阈值的目标与实时跟踪一样不会返回。

use std::collections::HashMap;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::{DetectedObject, TrackOptions, Tracker};
use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

#[derive(Error, Debug)]
pub enum ReplayTrackerError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("第 {line} 行解析失败: {source}")]
  ParseError {
    line: usize,
    source: serde_json::Error,
  },
  #[error("第 {frame} 帧的轨迹 ID {track_id} 重复")]
  DuplicateTrackId { frame: u64, track_id: u64 },
}

#[derive(Debug, Deserialize)]
struct FrameRecord {
  frame: u64,
  #[serde(default)]
  objects: Vec<DetectedObject>,
}

#[derive(Debug, Default)]
pub struct ReplayTracker {
  frames: HashMap<u64, Vec<DetectedObject>>,
}

impl FromUrlWithScheme for ReplayTracker {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayTracker {
  type Error = ReplayTrackerError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayTrackerError::SchemeMismatch);
    }
    Self::open(Path::new(url.path()))
  }
}

impl ReplayTracker {
  pub fn open(path: &Path) -> Result<Self, ReplayTrackerError> {
    let file = std::fs::File::open(path)?;
    let tracker = Self::from_reader(BufReader::new(file))?;
    info!(
      "已载入回放文件 {}: {} 帧含检测",
      path.display(),
      tracker.frames.len()
    );
    Ok(tracker)
  }

  pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ReplayTrackerError> {
    let mut frames: HashMap<u64, Vec<DetectedObject>> = HashMap::new();
    for (number, line) in reader.lines().enumerate() {
      let line = line?;
      let trimmed = line.trim();
      if trimmed.is_empty() || trimmed.starts_with('#') {
        continue;
      }
      let record: FrameRecord =
        serde_json::from_str(trimmed).map_err(|source| ReplayTrackerError::ParseError {
          line: number + 1,
          source,
        })?;
      let objects = frames.entry(record.frame).or_default();
      objects.extend(record.objects);

      let mut seen = std::collections::HashSet::new();
      for track_id in objects.iter().filter_map(|object| object.track_id) {
        if !seen.insert(track_id) {
          return Err(ReplayTrackerError::DuplicateTrackId {
            frame: record.frame,
            track_id,
          });
        }
      }
    }
    Ok(Self { frames })
  }
}

impl Tracker for ReplayTracker {
  type Error = ReplayTrackerError;

  fn track(
    &mut self,
    frame: &Frame,
    options: &TrackOptions,
  ) -> Result<Vec<DetectedObject>, Self::Error> {
    let objects: Vec<DetectedObject> = self
      .frames
      .get(&frame.index)
      .map(|objects| {
        objects
          .iter()
          .filter(|object| options.reports(object))
          .cloned()
          .collect()
      })
      .unwrap_or_default();
    debug!("回放第 {} 帧: {} 个目标", frame.index, objects.len());
    Ok(objects)
  }
}
