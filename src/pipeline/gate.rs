// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline/gate.rs - 按跟踪 ID 去重
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

use std::collections::HashSet;

/// 本次运行中已记录过违规的跟踪 ID。
///
/// 只增不减：ID 一旦记录，在本次运行剩余时间内永久排除，没有过期窗口。
/// 跟踪器丢失目标后给同一骑手分配新 ID 时仍会重复记录，这里不做纠正。
/// 检查与插入在一次 `HashSet::insert` 中完成，`&mut self` 保证调用方独占。
#[derive(Debug, Default)]
pub struct ProcessedIds {
  seen: HashSet<u64>,
}

impl ProcessedIds {
  pub fn new() -> Self {
    Self::default()
  }

  /// 首次出现返回 `true` 并记下该 ID；之后同一 ID 一律返回 `false`
  pub fn admit(&mut self, track_id: u64) -> bool {
    self.seen.insert(track_id)
  }

  pub fn len(&self) -> usize {
    self.seen.len()
  }

  pub fn is_empty(&self) -> bool {
    self.seen.is_empty()
  }
}
