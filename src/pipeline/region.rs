// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/pipeline/region.rs - 车牌搜索区域估算
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

use crate::{config::PlateRegionConfig, model::BBox};

/// 帧内的像素矩形，左闭右开
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlateRegion {
  pub x1: u32,
  pub y1: u32,
  pub x2: u32,
  pub y2: u32,
}

impl PlateRegion {
  /// 假定车牌位于骑手框正下方、比骑手框略宽：
  ///
  /// ```text
  /// x1' = max(0, x1 - margin)    x2' = min(W, x2 + margin)
  /// y1' = min(y2, H)             y2' = min(y2 + depth, H)
  /// ```
  ///
  /// 这只是几何猜测，框贴着帧底边时结果面积为零。
  pub fn estimate(rider: &BBox, width: u32, height: u32, config: &PlateRegionConfig) -> Self {
    let [x1, _, x2, y2] = rider.to_pixels();
    let (w, h) = (width as i64, height as i64);
    let margin = config.margin as i64;
    let depth = config.depth as i64;

    let px1 = (x1 - margin).max(0).min(w);
    let px2 = (x2 + margin).min(w).max(px1);
    let py1 = y2.min(h).max(0);
    let py2 = (y2 + depth).min(h).max(py1);

    Self {
      x1: px1 as u32,
      y1: py1 as u32,
      x2: px2 as u32,
      y2: py2 as u32,
    }
  }

  pub fn width(&self) -> u32 {
    self.x2.saturating_sub(self.x1)
  }

  pub fn height(&self) -> u32 {
    self.y2.saturating_sub(self.y1)
  }

  pub fn is_empty(&self) -> bool {
    self.width() == 0 || self.height() == 0
  }
}
