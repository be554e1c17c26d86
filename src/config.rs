// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/config.rs - 巡查参数配置
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

use thiserror::Error;

use crate::model::{HelmetLabel, TrackOptions, WithLabel};

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
  #[error("抽帧步长必须大于 0")]
  ZeroStride,
  #[error("{name} 必须在 0.0 - 1.0 之间，实际为 {value}")]
  ThresholdOutOfRange { name: &'static str, value: f32 },
  #[error("帧率必须为正数，实际为 {0}")]
  InvalidFrameRate(f64),
}

/// 检测器出错时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetectorErrorPolicy {
  /// 立即终止本次运行
  #[default]
  Abort,
  /// 记录警告，跳过该帧继续
  SkipFrame,
}

/// 车牌搜索区域：骑手框下方 `depth` 像素，左右各放宽 `margin` 像素
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRegionConfig {
  pub margin: u32,
  pub depth: u32,
}

impl Default for PlateRegionConfig {
  fn default() -> Self {
    Self {
      margin: 50,
      depth: 200,
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
  /// 每 `sample_stride` 帧送检一帧
  pub sample_stride: u64,
  pub detection_confidence: f32,
  pub track_confidence: f32,
  /// 视为“未戴头盔”的类别 ID
  pub violation_class: u32,
  pub plate_region: PlateRegionConfig,
  /// 识别结果少于该字符数时记为看不清
  pub min_plate_chars: usize,
  /// 覆盖输入源报告的帧率
  pub fps_override: Option<f64>,
  pub detector_errors: DetectorErrorPolicy,
  /// 最多读取的帧数，`None` 表示读到流结束
  pub max_frames: Option<u64>,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      sample_stride: 3,
      detection_confidence: 0.4,
      track_confidence: 0.5,
      violation_class: HelmetLabel::WithoutHelmet.to_label_id(),
      plate_region: PlateRegionConfig::default(),
      min_plate_chars: 4,
      fps_override: None,
      detector_errors: DetectorErrorPolicy::default(),
      max_frames: None,
    }
  }
}

impl PipelineConfig {
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.sample_stride == 0 {
      return Err(ConfigError::ZeroStride);
    }
    check_threshold("detection_confidence", self.detection_confidence)?;
    check_threshold("track_confidence", self.track_confidence)?;
    if let Some(fps) = self.fps_override {
      check_fps(fps)?;
    }
    Ok(())
  }

  /// 跟踪调用参数；运行期间总是保留轨迹
  pub fn track_options(&self) -> TrackOptions {
    TrackOptions {
      confidence: self.detection_confidence,
      track_confidence: self.track_confidence,
      persist: true,
    }
  }
}

fn check_threshold(name: &'static str, value: f32) -> Result<(), ConfigError> {
  if (0.0..=1.0).contains(&value) {
    Ok(())
  } else {
    Err(ConfigError::ThresholdOutOfRange { name, value })
  }
}

pub(crate) fn check_fps(fps: f64) -> Result<f64, ConfigError> {
  if fps.is_finite() && fps > 0.0 {
    Ok(fps)
  } else {
    Err(ConfigError::InvalidFrameRate(fps))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_are_valid() {
    let config = PipelineConfig::default();
    assert_eq!(config.validate(), Ok(()));
    assert_eq!(config.sample_stride, 3);
    assert_eq!(config.violation_class, 1);
    assert_eq!(config.plate_region, PlateRegionConfig { margin: 50, depth: 200 });
  }

  #[test]
  fn rejects_zero_stride() {
    let config = PipelineConfig {
      sample_stride: 0,
      ..Default::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::ZeroStride));
  }

  #[test]
  fn rejects_out_of_range_thresholds() {
    let config = PipelineConfig {
      track_confidence: 1.5,
      ..Default::default()
    };
    assert!(matches!(
      config.validate(),
      Err(ConfigError::ThresholdOutOfRange {
        name: "track_confidence",
        ..
      })
    ));
  }

  #[test]
  fn rejects_non_positive_fps_override() {
    for fps in [0.0, -30.0, f64::NAN] {
      let config = PipelineConfig {
        fps_override: Some(fps),
        ..Default::default()
      };
      assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidFrameRate(_))
      ));
    }
  }
}
