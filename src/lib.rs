// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/lib.rs - 库主文件
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

//! 行车记录仪视频中的未戴头盔骑手巡查。
//!
//! 检测/跟踪模型与文字识别模型都是外部协作者，通过 [`model::Tracker`] 与
//! [`ocr::PlateReader`] 注入；本库负责按步长抽帧、按跟踪 ID 去重、估算车牌
//! 搜索区域，以及生成带证据图像的违规记录。

pub mod config;
pub mod frame;
pub mod input;
pub mod model;
pub mod ocr;
pub mod output;
pub mod pipeline;

pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}

/// 从 URL 查询参数中读取并解析一个值，缺失或无法解析时返回 `None`。
pub(crate) fn query_value<T: std::str::FromStr>(url: &url::Url, key: &str) -> Option<T> {
  url
    .query_pairs()
    .find(|(k, _)| k == key)
    .and_then(|(_, v)| v.parse::<T>().ok())
}

/// 二进制程序共用的日志过滤器：优先读取 `RUST_LOG`，缺省为 `info`
pub fn log_filter() -> tracing_subscriber::EnvFilter {
  log_filter_from(std::env::var("RUST_LOG").ok().as_deref())
}

fn log_filter_from(directives: Option<&str>) -> tracing_subscriber::EnvFilter {
  directives
    .and_then(|d| tracing_subscriber::EnvFilter::try_new(d).ok())
    .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("info"))
}
