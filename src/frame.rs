// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/frame.rs - 视频帧定义
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

use image::{GrayImage, RgbImage, imageops};

use crate::pipeline::PlateRegion;

/// 一帧解码后的 RGB 图像
#[derive(Debug, Clone)]
pub struct Frame {
  /// RGB 图像数据（HWC 排列）
  pub image: RgbImage,
  /// 帧序号，从 1 开始
  pub index: u64,
}

impl Frame {
  pub fn new(image: RgbImage, index: u64) -> Self {
    Self { image, index }
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 按区域裁剪并转为灰度图。区域面积为零时返回 `None`。
  pub fn crop_gray(&self, region: &PlateRegion) -> Option<GrayImage> {
    if region.is_empty() {
      return None;
    }
    // 区域可能来自其他尺寸的帧
    let x = region.x1.min(self.width());
    let y = region.y1.min(self.height());
    let width = region.width().min(self.width() - x);
    let height = region.height().min(self.height() - y);
    if width == 0 || height == 0 {
      return None;
    }

    let crop = imageops::crop_imm(&self.image, x, y, width, height).to_image();
    Some(imageops::grayscale(&crop))
  }
}
