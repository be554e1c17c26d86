// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/output.rs - 证据图像与违规日志输出
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

use std::path::PathBuf;

use image::RgbImage;
use thiserror::Error;

use crate::pipeline::{RunReport, ViolationRecord};

mod directory_report;
mod draw;

pub use self::directory_report::{DirectoryReport, LogFormat};
pub use self::draw::EvidenceDraw;

/// 证据与报告的落盘端。
///
/// 证据图像按文件名写出并返回其路径，记录按生成顺序追加；运行结束时调用一次
/// `finish`。输入源为空时 `finish` 不会被调用。
pub trait EvidenceSink {
  type Error: std::error::Error + Send + Sync + 'static;

  fn write_evidence(&mut self, name: &str, image: &RgbImage) -> Result<PathBuf, Self::Error>;

  fn append_record(&mut self, record: &ViolationRecord) -> Result<(), Self::Error>;

  fn finish(&mut self, report: &RunReport) -> Result<(), Self::Error>;
}

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("I/O 错误 ({path}): {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("JSON 序列化失败: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("无法加载字体文件: {0}")]
  FontError(PathBuf),
}
