// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/model/yolo_tract.rs - 基于 tract 的 YOLO 检测 + IoU 跟踪
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

//! URL 形如 `tract:///models/best.onnx?size=640&nms=0.45`。
//!
//! 模型需为 YOLOv8 导出格式：输入 `[1, 3, size, size]`（RGB，归一化到 0-1），
//! 输出 `[1, 4 + 类别数, 候选数]`，前四行为 `cx, cy, w, h`。

use std::path::Path;

use image::imageops::{self, FilterType};
use thiserror::Error;
use tract_onnx::prelude::*;
use tracing::{debug, info};
use url::Url;

use super::{BBox, DetectedObject, IouTracker, TrackOptions, Tracker};
use crate::{FromUrl, FromUrlWithScheme, frame::Frame, query_value};

const DEFAULT_INPUT_SIZE: u32 = 640;
const DEFAULT_NMS_THRESHOLD: f32 = 0.45;

#[derive(Error, Debug)]
pub enum YoloTractError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("模型加载或推理失败: {0}")]
  Tract(TractError),
  #[error("模型输出形状不符: {0}")]
  OutputShape(String),
}

// TractError 即 anyhow::Error，未实现 std::error::Error，不能用 #[from]
impl From<TractError> for YoloTractError {
  fn from(err: TractError) -> Self {
    YoloTractError::Tract(err)
  }
}

pub struct YoloTractTracker {
  model: TypedSimplePlan<TypedModel>,
  input_size: u32,
  nms_threshold: f32,
  tracker: IouTracker,
}

impl FromUrlWithScheme for YoloTractTracker {
  const SCHEME: &'static str = "tract";
}

impl FromUrl for YoloTractTracker {
  type Error = YoloTractError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(YoloTractError::SchemeMismatch);
    }
    let input_size = query_value(url, "size").unwrap_or(DEFAULT_INPUT_SIZE);
    let nms_threshold = query_value(url, "nms").unwrap_or(DEFAULT_NMS_THRESHOLD);
    Self::load(Path::new(url.path()), input_size, nms_threshold)
  }
}

impl YoloTractTracker {
  pub fn load(path: &Path, input_size: u32, nms_threshold: f32) -> Result<Self, YoloTractError> {
    let side = input_size as usize;
    let model = tract_onnx::onnx()
      .model_for_path(path)?
      .with_input_fact(
        0,
        InferenceFact::dt_shape(f32::datum_type(), tvec!(1, 3, side, side)),
      )?
      .into_optimized()?
      .into_runnable()?;
    info!("已载入 ONNX 模型 {} ({}x{})", path.display(), side, side);

    Ok(Self {
      model,
      input_size,
      nms_threshold,
      tracker: IouTracker::default(),
    })
  }

  fn build_input(&self, frame: &Frame) -> Tensor {
    let resized = imageops::resize(
      &frame.image,
      self.input_size,
      self.input_size,
      FilterType::Triangle,
    );
    let side = self.input_size as usize;
    tract_ndarray::Array4::from_shape_fn((1, 3, side, side), |(_, c, y, x)| {
      resized.get_pixel(x as u32, y as u32)[c] as f32 / 255.0
    })
    .into_tensor()
  }

  fn detect(&self, frame: &Frame, confidence: f32) -> Result<Vec<DetectedObject>, YoloTractError> {
    let input = self.build_input(frame);
    let outputs = self.model.run(tvec!(input.into()))?;
    let output = outputs
      .first()
      .ok_or_else(|| YoloTractError::OutputShape("模型没有输出".to_string()))?;
    let view = output
      .to_array_view::<f32>()?
      .into_dimensionality::<tract_ndarray::Ix3>()
      .map_err(|e| YoloTractError::OutputShape(e.to_string()))?;

    let (_, rows, candidates) = view.dim();
    if rows <= 4 {
      return Err(YoloTractError::OutputShape(format!(
        "期望至少 5 行，实际 {}",
        rows
      )));
    }

    let scale_x = frame.width() as f32 / self.input_size as f32;
    let scale_y = frame.height() as f32 / self.input_size as f32;

    let mut detections = Vec::new();
    for i in 0..candidates {
      let (class_id, score) = (4..rows)
        .map(|row| (row - 4, view[[0, row, i]]))
        .fold((0, f32::NEG_INFINITY), |best, item| {
          if item.1 > best.1 { item } else { best }
        });
      if score < confidence {
        continue;
      }
      let (cx, cy, w, h) = (
        view[[0, 0, i]],
        view[[0, 1, i]],
        view[[0, 2, i]],
        view[[0, 3, i]],
      );
      let bbox = BBox::new(
        ((cx - w / 2.0) * scale_x).max(0.0),
        ((cy - h / 2.0) * scale_y).max(0.0),
        ((cx + w / 2.0) * scale_x).min(frame.width() as f32),
        ((cy + h / 2.0) * scale_y).min(frame.height() as f32),
      );
      detections.push(DetectedObject {
        class_id: class_id as u32,
        confidence: score,
        bbox,
        track_id: None,
      });
    }

    Ok(non_max_suppression(detections, self.nms_threshold))
  }
}

/// 按类别做非极大值抑制，结果按置信度降序
fn non_max_suppression(mut detections: Vec<DetectedObject>, threshold: f32) -> Vec<DetectedObject> {
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
  let mut kept: Vec<DetectedObject> = Vec::new();
  for det in detections {
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == det.class_id && k.bbox.iou(&det.bbox) > threshold);
    if !suppressed {
      kept.push(det);
    }
  }
  kept
}

impl Tracker for YoloTractTracker {
  type Error = YoloTractError;

  fn track(
    &mut self,
    frame: &Frame,
    options: &TrackOptions,
  ) -> Result<Vec<DetectedObject>, Self::Error> {
    if !options.persist {
      self.tracker.reset();
    }
    let detections = self.detect(frame, options.confidence)?;
    debug!("第 {} 帧检测到 {} 个目标", frame.index, detections.len());
    let tracked = self.tracker.update(detections, options.track_confidence);
    debug!("活动轨迹 {} 条", self.tracker.active_tracks());
    // 低置信度检测只用于延续轨迹，不作为结果返回
    Ok(
      tracked
        .into_iter()
        .filter(|object| options.reports(object))
        .collect(),
    )
  }
}
