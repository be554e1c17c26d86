// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/model.rs - 检测/跟踪模型
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{FromUrl, frame::Frame};

/// 检测/跟踪协作者。
///
/// 给定一帧，返回检测到的目标；`persist` 为真时，同一物体在相邻调用之间保持
/// 相同的 `track_id`。跟踪状态属于实现者自身，因此 `track` 需要 `&mut self`。
pub trait Tracker {
  type Error;

  fn track(
    &mut self,
    frame: &Frame,
    options: &TrackOptions,
  ) -> Result<Vec<DetectedObject>, Self::Error>;
}

impl<T: Tracker + ?Sized> Tracker for Box<T> {
  type Error = T::Error;

  fn track(
    &mut self,
    frame: &Frame,
    options: &TrackOptions,
  ) -> Result<Vec<DetectedObject>, Self::Error> {
    (**self).track(frame, options)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackOptions {
  /// 检测置信度阈值，低于该值的检测不参与跟踪
  pub confidence: f32,
  /// 跟踪结果的置信度阈值：只有达到该值的检测才能新建轨迹或被返回
  pub track_confidence: f32,
  /// 是否在调用之间保留轨迹
  pub persist: bool,
}

impl TrackOptions {
  /// 该目标是否应出现在跟踪结果中
  pub fn reports(&self, object: &DetectedObject) -> bool {
    object.confidence >= self.confidence.max(self.track_confidence)
  }
}

impl Default for TrackOptions {
  fn default() -> Self {
    Self {
      confidence: 0.4,
      track_confidence: 0.5,
      persist: true,
    }
  }
}

/// 像素坐标下的轴对齐矩形 `[x1, y1, x2, y2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
  pub x1: f32,
  pub y1: f32,
  pub x2: f32,
  pub y2: f32,
}

impl BBox {
  pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
    Self { x1, y1, x2, y2 }
  }

  pub fn width(&self) -> f32 {
    (self.x2 - self.x1).max(0.0)
  }

  pub fn height(&self) -> f32 {
    (self.y2 - self.y1).max(0.0)
  }

  pub fn area(&self) -> f32 {
    self.width() * self.height()
  }

  pub fn iou(&self, other: &BBox) -> f32 {
    let inter = BBox::new(
      self.x1.max(other.x1),
      self.y1.max(other.y1),
      self.x2.min(other.x2),
      self.y2.min(other.y2),
    )
    .area();
    let union = self.area() + other.area() - inter;
    if union <= 0.0 { 0.0 } else { inter / union }
  }

  /// 截断为整数像素坐标，与 `int()` 语义一致
  pub fn to_pixels(&self) -> [i64; 4] {
    [
      self.x1 as i64,
      self.y1 as i64,
      self.x2 as i64,
      self.y2 as i64,
    ]
  }
}

impl From<[f32; 4]> for BBox {
  fn from([x1, y1, x2, y2]: [f32; 4]) -> Self {
    Self { x1, y1, x2, y2 }
  }
}

impl From<BBox> for [f32; 4] {
  fn from(bbox: BBox) -> Self {
    [bbox.x1, bbox.y1, bbox.x2, bbox.y2]
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
  pub class_id: u32,
  pub confidence: f32,
  pub bbox: BBox,
  /// 协作者未能分配身份时为空
  #[serde(default)]
  pub track_id: Option<u64>,
}

pub trait WithLabel: Sized + std::fmt::Debug {
  fn to_label_str(&self) -> String;
  fn to_label_id(&self) -> u32;
  fn from_label_id(id: u32) -> Self;
}

/// 头盔模型的类别：0 戴头盔，1 未戴头盔
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HelmetLabel {
  WithHelmet,
  WithoutHelmet,
  Other(u32),
}

impl WithLabel for HelmetLabel {
  fn to_label_str(&self) -> String {
    match self {
      HelmetLabel::WithHelmet => "With helmet".to_string(),
      HelmetLabel::WithoutHelmet => "Without helmet".to_string(),
      HelmetLabel::Other(id) => format!("class {}", id),
    }
  }

  fn to_label_id(&self) -> u32 {
    match self {
      HelmetLabel::WithHelmet => 0,
      HelmetLabel::WithoutHelmet => 1,
      HelmetLabel::Other(id) => *id,
    }
  }

  fn from_label_id(id: u32) -> Self {
    match id {
      0 => HelmetLabel::WithHelmet,
      1 => HelmetLabel::WithoutHelmet,
      other => HelmetLabel::Other(other),
    }
  }
}

pub mod iou_tracker;
pub use self::iou_tracker::{IouTracker, IouTrackerConfig};

#[cfg(feature = "model_replay")]
mod replay;
#[cfg(feature = "model_replay")]
pub use self::replay::{ReplayTracker, ReplayTrackerError};

#[cfg(feature = "model_tract")]
mod yolo_tract;
#[cfg(feature = "model_tract")]
pub use self::yolo_tract::{YoloTractError, YoloTractTracker};

#[derive(Error, Debug)]
pub enum ModelError {
  #[cfg(feature = "model_replay")]
  #[error("回放跟踪错误: {0}")]
  ReplayTrackerError(#[from] ReplayTrackerError),
  #[cfg(feature = "model_tract")]
  #[error("YOLO (tract) 推理错误: {0}")]
  YoloTractError(#[from] YoloTractError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum ModelWrapper {
  #[cfg(feature = "model_replay")]
  Replay(ReplayTracker),
  #[cfg(feature = "model_tract")]
  YoloTract(Box<YoloTractTracker>),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "model_replay")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ReplayTracker::SCHEME {
        return Ok(ModelWrapper::Replay(ReplayTracker::from_url(url)?));
      }
    }
    #[cfg(feature = "model_tract")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == YoloTractTracker::SCHEME {
        let model = YoloTractTracker::from_url(url)?;
        return Ok(ModelWrapper::YoloTract(Box::new(model)));
      }
    }
    Err(ModelError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl Tracker for ModelWrapper {
  type Error = ModelError;

  fn track(
    &mut self,
    frame: &Frame,
    options: &TrackOptions,
  ) -> Result<Vec<DetectedObject>, Self::Error> {
    match self {
      #[cfg(feature = "model_replay")]
      ModelWrapper::Replay(model) => model.track(frame, options).map_err(ModelError::from),
      #[cfg(feature = "model_tract")]
      ModelWrapper::YoloTract(model) => model.track(frame, options).map_err(ModelError::from),
    }
  }
}
