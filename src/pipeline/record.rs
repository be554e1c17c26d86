// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline/record.rs - 违规记录
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

use std::fmt;
use std::path::PathBuf;

use serde::{Serialize, Serializer};
use tracing::{debug, warn};

use super::{PlateRegion, PlaybackTimestamp};
use crate::{frame::Frame, ocr::PlateReader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
  NoHelmet,
}

impl fmt::Display for ViolationKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ViolationKind::NoHelmet => f.write_str("No Helmet"),
    }
  }
}

impl Serialize for ViolationKind {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// 记录中的车牌号，识别失败时为哨兵值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlateText {
  Recognized(String),
  /// 识别结果过短，视为噪声
  NotVisible,
  /// 识别器运行了但没有输出文字
  Unreadable,
  /// 搜索区域面积为零，未调用识别器
  Unknown,
  /// 识别器报错
  Failed,
}

impl PlateText {
  /// 多行输出以空格拼接；少于 `min_chars` 个字符的结果记为 [`PlateText::NotVisible`]
  pub fn from_lines<S: AsRef<str>>(lines: &[S], min_chars: usize) -> Self {
    let text = lines
      .iter()
      .map(|line| line.as_ref().trim())
      .filter(|line| !line.is_empty())
      .collect::<Vec<_>>()
      .join(" ");

    if text.is_empty() {
      PlateText::Unreadable
    } else if text.chars().count() < min_chars {
      PlateText::NotVisible
    } else {
      PlateText::Recognized(text)
    }
  }
}

impl fmt::Display for PlateText {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PlateText::Recognized(text) => f.write_str(text),
      PlateText::NotVisible => f.write_str("Not Visible"),
      PlateText::Unreadable => f.write_str("Unreadable"),
      PlateText::Unknown => f.write_str("Unknown"),
      PlateText::Failed => f.write_str("Error"),
    }
  }
}

impl Serialize for PlateText {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

/// 裁剪搜索区域并识别。任何失败都降级为哨兵值，不会向上传播。
pub fn recognize_plate<R: PlateReader + ?Sized>(
  reader: &mut R,
  frame: &Frame,
  region: &PlateRegion,
  min_chars: usize,
) -> PlateText {
  let Some(crop) = frame.crop_gray(region) else {
    debug!("车牌搜索区域为空: {:?}", region);
    return PlateText::Unknown;
  };

  match reader.read_lines(&crop) {
    Ok(lines) => PlateText::from_lines(&lines, min_chars),
    Err(e) => {
      warn!("车牌识别失败: {}", e);
      PlateText::Failed
    }
  }
}

/// 一条违规记录，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViolationRecord {
  pub track_id: u64,
  pub frame_index: u64,
  pub timestamp: PlaybackTimestamp,
  pub violation: ViolationKind,
  pub plate_text: PlateText,
  pub evidence: PathBuf,
}

/// 证据图像文件名，由轨迹 ID 与帧序号唯一确定
pub fn evidence_file_name(track_id: u64, frame_index: u64) -> String {
  format!("violation_ID{}_{}.jpg", track_id, frame_index)
}
