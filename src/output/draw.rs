// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/output/draw.rs - 证据图像标注
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use tracing::{info, warn};

use super::OutputError;
use crate::{model::BBox, pipeline::PlateRegion};

const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_OFFSET: i32 = 4;
const RIDER_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const RIDER_THICKNESS: u32 = 3;
const PLATE_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const PLATE_THICKNESS: u32 = 2;

// 默认字体 DejaVu Sans
static BUNDLED_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

/// 在帧的副本上画出骑手框、标题与车牌搜索框
pub struct EvidenceDraw {
  font: Option<FontArc>,
  font_size: f32,
}

impl Default for EvidenceDraw {
  fn default() -> Self {
    let font = FontArc::try_from_slice(BUNDLED_FONT)
      .map_err(|e| warn!("内置字体加载失败，证据图像将不带标题: {}", e))
      .ok();
    Self {
      font,
      font_size: LABEL_FONT_SIZE,
    }
  }
}

impl EvidenceDraw {
  pub fn with_font(font: FontArc) -> Self {
    Self {
      font: Some(font),
      font_size: LABEL_FONT_SIZE,
    }
  }

  pub fn with_font_file(path: &Path) -> Result<Self, OutputError> {
    let data = std::fs::read(path).map_err(|source| OutputError::IoError {
      path: path.to_path_buf(),
      source,
    })?;
    let font = FontArc::try_from_vec(data).map_err(|_| OutputError::FontError(path.to_path_buf()))?;
    info!("已加载标注字体 {}", path.display());
    Ok(Self::with_font(font))
  }

  pub fn annotate(
    &self,
    image: &RgbImage,
    track_id: u64,
    rider: &BBox,
    region: &PlateRegion,
  ) -> RgbImage {
    let mut canvas = image.clone();

    let [x1, y1, x2, y2] = rider.to_pixels();
    draw_box(&mut canvas, x1, y1, x2, y2, RIDER_COLOR, RIDER_THICKNESS);
    if let Some(font) = &self.font {
      let label = format!("ID: {} NO HELMET", track_id);
      let y = (y1 as i32 - self.font_size as i32 - LABEL_OFFSET).max(0);
      draw_text_mut(
        &mut canvas,
        Rgb(RIDER_COLOR),
        (x1 as i32).max(0),
        y,
        PxScale::from(self.font_size),
        font,
        &label,
      );
    }

    draw_box(
      &mut canvas,
      region.x1 as i64,
      region.y1 as i64,
      region.x2 as i64,
      region.y2 as i64,
      PLATE_COLOR,
      PLATE_THICKNESS,
    );
    canvas
  }
}

/// 画 `thickness` 像素宽的空心框，线条向框内加粗；`[x1, x2)` 左闭右开
fn draw_box(
  image: &mut RgbImage,
  x1: i64,
  y1: i64,
  x2: i64,
  y2: i64,
  color: [u8; 3],
  thickness: u32,
) {
  for t in 0..thickness as i64 {
    let width = x2 - x1 - 2 * t;
    let height = y2 - y1 - 2 * t;
    if width <= 0 || height <= 0 {
      break;
    }
    let rect = Rect::at((x1 + t) as i32, (y1 + t) as i32).of_size(width as u32, height as u32);
    draw_hollow_rect_mut(image, rect, Rgb(color));
  }
}
