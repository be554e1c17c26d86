// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/input/image_sequence.rs - 图像序列输入
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

//! 把目录中按文件名排序的图片当作视频帧流读取，例如
//! `ffmpeg -i clip.mp4 frames/%06d.png` 导出的帧。
//!
//! URL 形如 `frames:///path/to/dir?fps=30`，`fps` 缺省为 30。

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use super::{FrameSource, InputError};
use crate::{FromUrl, FromUrlWithScheme, frame::Frame, query_value};

const DEFAULT_FPS: f64 = 30.0;
const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

#[derive(Error, Debug)]
pub enum ImageSequenceInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error on {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("Image loading error on {path}: {source}")]
  ImageLoadError {
    path: PathBuf,
    source: image::ImageError,
  },
  #[error("Frame {path} is {actual:?}, expected {expected:?}")]
  SizeMismatch {
    path: PathBuf,
    expected: (u32, u32),
    actual: (u32, u32),
  },
}

pub struct ImageSequenceInput {
  pending: VecDeque<PathBuf>,
  first: Option<RgbImage>,
  next_index: u64,
  fps: f64,
  width: u32,
  height: u32,
}

impl FromUrlWithScheme for ImageSequenceInput {
  const SCHEME: &'static str = "frames";
}

impl FromUrl for ImageSequenceInput {
  type Error = ImageSequenceInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageSequenceInputError::SchemaMismatch);
    }

    let fps = query_value(url, "fps").unwrap_or(DEFAULT_FPS);
    Self::open(Path::new(url.path()), fps)
  }
}

impl ImageSequenceInput {
  pub fn open(directory: &Path, fps: f64) -> Result<Self, ImageSequenceInputError> {
    let io_error = |source| ImageSequenceInputError::IoError {
      path: directory.to_path_buf(),
      source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(directory).map_err(io_error)? {
      let path = entry.map_err(io_error)?.path();
      if is_image_file(&path) {
        files.push(path);
      }
    }
    files.sort();
    debug!("图像序列 {} 共 {} 帧", directory.display(), files.len());

    let mut pending: VecDeque<PathBuf> = files.into();
    // 先解码首帧以确定尺寸，空目录则保持 0x0，由调用方判定为空流
    let first = match pending.pop_front() {
      Some(path) => Some(load_rgb(&path)?),
      None => None,
    };
    let (width, height) = first.as_ref().map(RgbImage::dimensions).unwrap_or((0, 0));

    Ok(Self {
      pending,
      first,
      next_index: 1,
      fps,
      width,
      height,
    })
  }

  fn next_image(&mut self) -> Option<Result<RgbImage, ImageSequenceInputError>> {
    if let Some(image) = self.first.take() {
      return Some(Ok(image));
    }
    let path = self.pending.pop_front()?;
    Some(load_rgb(&path).and_then(|image| {
      if image.dimensions() != (self.width, self.height) {
        return Err(ImageSequenceInputError::SizeMismatch {
          path,
          expected: (self.width, self.height),
          actual: image.dimensions(),
        });
      }
      Ok(image)
    }))
  }
}

fn is_image_file(path: &Path) -> bool {
  path
    .extension()
    .and_then(|ext| ext.to_str())
    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

fn load_rgb(path: &Path) -> Result<RgbImage, ImageSequenceInputError> {
  let reader = ImageReader::open(path).map_err(|source| ImageSequenceInputError::IoError {
    path: path.to_path_buf(),
    source,
  })?;
  let image = reader
    .decode()
    .map_err(|source| ImageSequenceInputError::ImageLoadError {
      path: path.to_path_buf(),
      source,
    })?;
  Ok(image.into_rgb8())
}

impl Iterator for ImageSequenceInput {
  type Item = Result<Frame, InputError>;

  fn next(&mut self) -> Option<Self::Item> {
    let image = self.next_image()?;
    let index = self.next_index;
    self.next_index += 1;
    Some(
      image
        .map(|image| Frame::new(image, index))
        .map_err(InputError::from),
    )
  }
}

impl FrameSource for ImageSequenceInput {
  fn fps(&self) -> f64 {
    self.fps
  }

  fn width(&self) -> u32 {
    self.width
  }

  fn height(&self) -> u32 {
    self.height
  }
}
