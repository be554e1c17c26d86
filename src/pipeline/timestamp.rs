// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline/timestamp.rs - 播放时间
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

use serde::{Serialize, Serializer};

/// 视频播放到某帧时经过的整秒数，显示为 `H:MM:SS`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlaybackTimestamp {
  seconds: u64,
}

impl PlaybackTimestamp {
  /// `frame_index / fps`，向下截断到整秒。`fps` 须为正数，由调用方保证。
  pub fn from_frame(frame_index: u64, fps: f64) -> Self {
    let seconds = (frame_index as f64 / fps).floor();
    Self::from_seconds(if seconds.is_finite() && seconds > 0.0 {
      seconds as u64
    } else {
      0
    })
  }

  pub fn from_seconds(seconds: u64) -> Self {
    Self { seconds }
  }
}

impl fmt::Display for PlaybackTimestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let hours = self.seconds / 3600;
    let minutes = self.seconds % 3600 / 60;
    let seconds = self.seconds % 60;
    write!(f, "{}:{:02}:{:02}", hours, minutes, seconds)
  }
}

impl Serialize for PlaybackTimestamp {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn whole_seconds() {
    assert_eq!(PlaybackTimestamp::from_frame(90, 30.0).to_string(), "0:00:03");
  }

  #[test]
  fn truncates_instead_of_rounding() {
    assert_eq!(PlaybackTimestamp::from_frame(6, 30.0).to_string(), "0:00:00");
    assert_eq!(PlaybackTimestamp::from_frame(89, 30.0).to_string(), "0:00:02");
    assert_eq!(PlaybackTimestamp::from_frame(59, 29.97).to_string(), "0:00:01");
  }

  #[test]
  fn hours_are_not_padded() {
    assert_eq!(PlaybackTimestamp::from_seconds(3 * 3600 + 5 * 60 + 9).to_string(), "3:05:09");
    assert_eq!(PlaybackTimestamp::from_seconds(12 * 3600).to_string(), "12:00:00");
  }

  #[test]
  fn serializes_as_display_string() {
    let json = serde_json::to_string(&PlaybackTimestamp::from_seconds(61)).unwrap();
    assert_eq!(json, "\"0:01:01\"");
  }
}
