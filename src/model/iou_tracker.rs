// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/model/iou_tracker.rs - 基于 IoU 的贪心跟踪器
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

//! 为逐帧检测结果分配持久的轨迹 ID。
//!
//! 匹配只在同类别之间进行，按 IoU 从大到小贪心配对。高置信度的未匹配检测
//! 新建轨迹；低置信度的未匹配检测不分配 ID。连续 `max_misses` 次未被匹配的
//! 轨迹被丢弃，之后同一物体再出现会得到新 ID。

use tracing::debug;

use super::{BBox, DetectedObject};

#[derive(Debug, Clone, Copy)]
pub struct IouTrackerConfig {
  pub iou_threshold: f32,
  pub max_misses: u32,
}

impl Default for IouTrackerConfig {
  fn default() -> Self {
    Self {
      iou_threshold: 0.3,
      max_misses: 30,
    }
  }
}

#[derive(Debug, Clone)]
struct Track {
  id: u64,
  class_id: u32,
  bbox: BBox,
  misses: u32,
}

#[derive(Debug)]
pub struct IouTracker {
  config: IouTrackerConfig,
  tracks: Vec<Track>,
  next_id: u64,
}

impl Default for IouTracker {
  fn default() -> Self {
    Self::new(IouTrackerConfig::default())
  }
}

impl IouTracker {
  pub fn new(config: IouTrackerConfig) -> Self {
    Self {
      config,
      tracks: Vec::new(),
      next_id: 1,
    }
  }

  /// 清空所有轨迹。ID 计数不回退，保证一次运行内 ID 不重复。
  pub fn reset(&mut self) {
    self.tracks.clear();
  }

  pub fn active_tracks(&self) -> usize {
    self.tracks.len()
  }

  /// 用本帧检测更新轨迹，返回带 `track_id` 的检测结果（顺序与输入一致）
  pub fn update(
    &mut self,
    mut detections: Vec<DetectedObject>,
    track_confidence: f32,
  ) -> Vec<DetectedObject> {
    let mut candidates = Vec::new();
    for (t, track) in self.tracks.iter().enumerate() {
      for (d, det) in detections.iter().enumerate() {
        if det.class_id != track.class_id {
          continue;
        }
        let iou = track.bbox.iou(&det.bbox);
        if iou >= self.config.iou_threshold {
          candidates.push((iou, t, d));
        }
      }
    }
    candidates.sort_by(|a, b| b.0.total_cmp(&a.0));

    let mut track_used = vec![false; self.tracks.len()];
    for (_, t, d) in candidates {
      if track_used[t] || detections[d].track_id.is_some() {
        continue;
      }
      track_used[t] = true;
      let track = &mut self.tracks[t];
      track.bbox = detections[d].bbox;
      track.misses = 0;
      detections[d].track_id = Some(track.id);
    }

    for (track, used) in self.tracks.iter_mut().zip(&track_used) {
      if !used {
        track.misses += 1;
      }
    }
    let max_misses = self.config.max_misses;
    self.tracks.retain(|track| track.misses <= max_misses);

    for det in detections.iter_mut() {
      if det.track_id.is_some() || det.confidence < track_confidence {
        continue;
      }
      let id = self.next_id;
      self.next_id += 1;
      debug!("新建轨迹 {} (class {})", id, det.class_id);
      self.tracks.push(Track {
        id,
        class_id: det.class_id,
        bbox: det.bbox,
        misses: 0,
      });
      det.track_id = Some(id);
    }

    detections
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(class_id: u32, confidence: f32, bbox: [f32; 4]) -> DetectedObject {
    DetectedObject {
      class_id,
      confidence,
      bbox: bbox.into(),
      track_id: None,
    }
  }

  #[test]
  fn keeps_identity_for_overlapping_boxes() {
    let mut tracker = IouTracker::default();
    let first = tracker.update(vec![det(1, 0.9, [100.0, 100.0, 200.0, 300.0])], 0.5);
    let second = tracker.update(vec![det(1, 0.9, [105.0, 102.0, 205.0, 303.0])], 0.5);
    assert_eq!(first[0].track_id, Some(1));
    assert_eq!(second[0].track_id, Some(1));
  }

  #[test]
  fn different_classes_do_not_match() {
    let mut tracker = IouTracker::default();
    tracker.update(vec![det(0, 0.9, [0.0, 0.0, 50.0, 50.0])], 0.5);
    let out = tracker.update(vec![det(1, 0.9, [0.0, 0.0, 50.0, 50.0])], 0.5);
    assert_eq!(out[0].track_id, Some(2));
  }

  #[test]
  fn low_confidence_extends_but_never_starts_tracks() {
    let mut tracker = IouTracker::default();
    let out = tracker.update(vec![det(1, 0.3, [0.0, 0.0, 50.0, 50.0])], 0.5);
    assert_eq!(out[0].track_id, None);

    tracker.update(vec![det(1, 0.8, [0.0, 0.0, 50.0, 50.0])], 0.5);
    let out = tracker.update(vec![det(1, 0.3, [2.0, 2.0, 52.0, 52.0])], 0.5);
    assert_eq!(out[0].track_id, Some(1));
  }

  #[test]
  fn lost_tracks_expire_and_ids_are_not_reused() {
    let mut tracker = IouTracker::new(IouTrackerConfig {
      iou_threshold: 0.3,
      max_misses: 1,
    });
    tracker.update(vec![det(1, 0.9, [0.0, 0.0, 50.0, 50.0])], 0.5);
    tracker.update(Vec::new(), 0.5);
    tracker.update(Vec::new(), 0.5);
    assert_eq!(tracker.active_tracks(), 0);

    let out = tracker.update(vec![det(1, 0.9, [0.0, 0.0, 50.0, 50.0])], 0.5);
    assert_eq!(out[0].track_id, Some(2));
  }

  #[test]
  fn ids_are_unique_within_a_frame() {
    let mut tracker = IouTracker::default();
    let out = tracker.update(
      vec![
        det(1, 0.9, [0.0, 0.0, 50.0, 50.0]),
        det(1, 0.9, [10.0, 10.0, 60.0, 60.0]),
      ],
      0.5,
    );
    assert_ne!(out[0].track_id, out[1].track_id);

    // 两个检测都与同一条轨迹重叠时，只有一个能继承它
    let mut tracker = IouTracker::default();
    tracker.update(vec![det(1, 0.9, [0.0, 0.0, 50.0, 50.0])], 0.5);
    let out = tracker.update(
      vec![
        det(1, 0.9, [1.0, 1.0, 51.0, 51.0]),
        det(1, 0.9, [3.0, 3.0, 53.0, 53.0]),
      ],
      0.5,
    );
    assert_eq!(out[0].track_id, Some(1));
    assert_eq!(out[1].track_id, Some(2));
  }
}
