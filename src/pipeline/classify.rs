// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline/classify.rs - 违规筛选
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

use crate::model::{BBox, DetectedObject};

/// 一个带身份的违规目标
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Violation {
  pub track_id: u64,
  pub bbox: BBox,
  pub confidence: f32,
}

/// 选出类别为 `violation_class` 且带有跟踪 ID 的目标。
///
/// 没有 ID 的目标无法去重，直接丢弃。
pub fn classify_violations(objects: &[DetectedObject], violation_class: u32) -> Vec<Violation> {
  objects
    .iter()
    .filter(|object| object.class_id == violation_class)
    .filter_map(|object| {
      object.track_id.map(|track_id| Violation {
        track_id,
        bbox: object.bbox,
        confidence: object.confidence,
      })
    })
    .collect()
}
