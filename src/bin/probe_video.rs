// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/bin/probe_video.rs - 检查输入源能否打开并读完
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::num::NonZeroU64;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{info, warn};
use url::Url;

use toukui::{
  FromUrl,
  log_filter,
  input::{FrameSource, InputWrapper},
  model::{HelmetLabel, WithLabel},
  pipeline::{FrameSampler, PlaybackTimestamp},
};

/// 打开输入源，打印分辨率、帧率、总帧数与抽检帧数；或列出模型类别
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  #[arg(long, value_name = "SOURCE", required_unless_present = "list_classes")]
  pub input: Option<Url>,
  /// 只读取元数据，不解码全部帧
  #[arg(long)]
  pub header_only: bool,
  /// 按该步长统计会被抽检的帧数
  #[arg(long, default_value = "3", value_name = "N")]
  pub stride: NonZeroU64,
  /// 列出头盔模型的类别 ID 与名称
  #[arg(long)]
  pub list_classes: bool,
  /// 与 --list-classes 一起使用，模型的类别总数
  #[arg(long, default_value = "2", value_name = "COUNT")]
  pub classes: u32,
}

fn class_names(count: u32) -> Vec<(u32, String)> {
  (0..count)
    .map(HelmetLabel::from_label_id)
    .map(|label| (label.to_label_id(), label.to_label_str()))
    .collect()
}

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_env_filter(log_filter()).init();

  let args = Args::parse();
  if args.list_classes {
    for (id, name) in class_names(args.classes) {
      info!("{}: {}", id, name);
    }
  }
  let Some(url) = &args.input else {
    return Ok(());
  };

  let mut source = InputWrapper::from_url(url)?;

  info!("输入来源: {}", url);
  info!("分辨率: {}x{}", source.width(), source.height());
  info!("帧率: {:.2}", source.fps());

  if args.header_only {
    return Ok(());
  }

  let mut frames = 0u64;
  for frame in source.by_ref() {
    match frame {
      Ok(_) => frames += 1,
      Err(e) => {
        warn!("第 {} 帧读取失败: {}", frames + 1, e);
        break;
      }
    }
  }

  if frames == 0 {
    bail!("输入源没有任何帧");
  }
  let sampler = FrameSampler::new(args.stride);
  info!("总帧数: {}", frames);
  info!(
    "抽检帧数: {} (每 {} 帧)",
    sampler.sampled_count(frames),
    sampler.stride()
  );
  if source.fps() > 0.0 {
    info!("时长: {}", PlaybackTimestamp::from_frame(frames, source.fps()));
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn lists_helmet_classes() {
    assert_eq!(
      class_names(3),
      vec![
        (0, "With helmet".to_string()),
        (1, "Without helmet".to_string()),
        (2, "class 2".to_string()),
      ]
    );
  }

  #[test]
  fn list_classes_needs_no_input() {
    let args = Args::try_parse_from(["probe-video", "--list-classes"]).unwrap();
    assert!(args.input.is_none());
    assert!(Args::try_parse_from(["probe-video"]).is_err());
  }
}
