// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 视频文件输入
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

//! # GStreamer 视频文件输入
//!
//! 通过 `filesrc ! decodebin ! videoconvert ! appsink` 逐帧解码视频文件。
//!
//! URL 形如 `gst://file/path/to/dashcam.mp4`。
//!
//! 与实时预览不同，违规巡查不能丢帧：appsink 设为 `sync=false drop=false`，
//! 解码速度由消费速度决定。
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use super::{FrameSource, InputError};
use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

#[derive(Error, Debug)]
pub enum GStreamerInputError {
  /// URI scheme 不匹配（期望 "gst://file/..."）
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("Failed to get appsink element")]
  AppSinkNotFound,
  #[error("Failed to convert element to appsink")]
  AppSinkConversionFailed,
  #[error("Failed to get video info from caps")]
  VideoInfoError,
  #[error("Unsupported video format")]
  UnsupportedFormat,
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  #[error("Buffer size mismatch: expected {expected} bytes, got {actual} bytes")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
}

pub struct GStreamerInput {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  /// 打开时预先拉取的首帧
  first: Option<RgbImage>,
  next_index: u64,
  fps: f64,
  width: u32,
  height: u32,
  finished: bool,
}

impl FromUrlWithScheme for GStreamerInput {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerInput {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME || url.host_str() != Some("file") {
      return Err(GStreamerInputError::SchemeMismatch);
    }
    Self::open(url.path())
  }
}

impl Drop for GStreamerInput {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl GStreamerInput {
  pub fn open(path: &str) -> Result<Self, GStreamerInputError> {
    gst::init()?;

    let description = format!(
      "filesrc location=\"{}\" ! decodebin ! videoconvert ! video/x-raw,format=RGB ! \
       appsink name=sink sync=false max-buffers=4 drop=false",
      path
    );
    info!("GStreamer pipeline description: {}", description);

    let pipeline = gst::parse::launch(&description)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    pipeline.set_state(gst::State::Playing)?;

    let mut input = GStreamerInput {
      pipeline,
      appsink,
      first: None,
      next_index: 1,
      fps: 0.0,
      width: 0,
      height: 0,
      finished: false,
    };

    // 拉取首帧以得到协商后的尺寸与帧率；拿不到首帧说明文件为空或无法解码
    match input.appsink.pull_sample() {
      Ok(sample) => {
        let (image, info) = convert_sample(&sample)?;
        let fps = info.fps();
        input.fps = if fps.denom() > 0 {
          fps.numer() as f64 / fps.denom() as f64
        } else {
          0.0
        };
        input.width = info.width();
        input.height = info.height();
        input.first = Some(image);
      }
      Err(e) => {
        input.check_bus()?;
        warn!("视频 {} 没有可解码的帧: {}", path, e);
        input.finished = true;
      }
    }

    Ok(input)
  }

  /// 把总线上的错误消息转成错误返回
  fn check_bus(&self) -> Result<(), GStreamerInputError> {
    let Some(bus) = self.pipeline.bus() else {
      return Ok(());
    };
    while let Some(message) = bus.pop() {
      if let gst::MessageView::Error(err) = message.view() {
        return Err(GStreamerInputError::PipelineError(format!(
          "{} ({:?})",
          err.error(),
          err.debug()
        )));
      }
    }
    Ok(())
  }

  fn next_image(&mut self) -> Option<Result<RgbImage, GStreamerInputError>> {
    if let Some(image) = self.first.take() {
      return Some(Ok(image));
    }
    if self.finished {
      return None;
    }
    match self.appsink.pull_sample() {
      Ok(sample) => Some(convert_sample(&sample).map(|(image, _)| image)),
      Err(_) => {
        self.finished = true;
        // EOS 与管道错误都会让 pull_sample 失败，只有后者需要上报
        match self.check_bus() {
          Ok(()) => None,
          Err(e) => {
            error!("GStreamer 解码失败: {}", e);
            Some(Err(e))
          }
        }
      }
    }
  }
}

impl Iterator for GStreamerInput {
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

impl FrameSource for GStreamerInput {
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

fn convert_sample(
  sample: &gst::Sample,
) -> Result<(RgbImage, gst_video::VideoInfo), GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("No buffer in sample".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("No caps in sample".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;
  if video_info.format() != gst_video::VideoFormat::Rgb {
    return Err(GStreamerInputError::UnsupportedFormat);
  }

  let width = video_info.width() as usize;
  let height = video_info.height() as usize;
  // RGB 行按 4 字节对齐，行宽可能大于 width * 3
  let stride = video_info.stride()[0] as usize;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerInputError::PipelineError(format!("Failed to map buffer for reading: {}", e))
  })?;
  let data = map.as_slice();

  let expected_size = stride * (height.saturating_sub(1)) + width * 3;
  if data.len() < expected_size {
    return Err(GStreamerInputError::BufferSizeMismatch {
      expected: expected_size,
      actual: data.len(),
    });
  }

  let mut pixels = Vec::with_capacity(width * height * 3);
  for row in 0..height {
    let start = row * stride;
    pixels.extend_from_slice(&data[start..start + width * 3]);
  }

  let image = RgbImage::from_raw(width as u32, height as u32, pixels)
    .ok_or_else(|| GStreamerInputError::PipelineError("Failed to build RGB image".to_string()))?;
  Ok((image, video_info))
}
