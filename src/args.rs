// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/args.rs - 命令行参数
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use clap::Parser;
use url::Url;

use toukui::config::{DetectorErrorPolicy, PipelineConfig, PlateRegionConfig};

/// 头盔巡查：从行车记录视频中找出未戴头盔的骑手并识别车牌
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// 支持格式:
  /// - 图片序列目录: frames:///path/to/dir?fps=30
  /// - 视频文件: gst://file/path/to/video.mp4
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 检测/跟踪模型
  /// 支持格式:
  /// - 跟踪结果回放: replay:///path/to/tracks.jsonl
  /// - ONNX 模型: tract:///path/to/best.onnx?size=640
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 车牌识别: none: 或 tesseract:///usr/share/tessdata?lang=eng
  #[arg(long, default_value = "none:", value_name = "OCR")]
  pub ocr: Url,

  /// 检测置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.4", value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 新建轨迹的最低置信度 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub track_confidence: f32,

  /// 每 N 帧抽检一帧
  #[arg(long, default_value = "3", value_name = "N")]
  pub stride: u64,

  /// 车牌搜索区域左右放宽的像素
  #[arg(long, default_value = "50", value_name = "PIXELS")]
  pub plate_margin: u32,

  /// 车牌搜索区域向下延伸的像素
  #[arg(long, default_value = "200", value_name = "PIXELS")]
  pub plate_depth: u32,

  /// 视为“未戴头盔”的类别 ID
  #[arg(long, default_value = "1", value_name = "CLASS")]
  pub violation_class: u32,

  /// 违规日志路径（.csv 或 .jsonl）
  #[arg(long, default_value = "output/violation_log.csv", value_name = "FILE")]
  pub log: PathBuf,

  /// 证据图像目录
  #[arg(long, default_value = "output/frames", value_name = "DIR")]
  pub evidence_dir: PathBuf,

  /// 车牌识别结果的最少字符数
  #[arg(long, default_value = "4", value_name = "COUNT")]
  pub min_plate_chars: usize,

  /// 覆盖输入源报告的帧率
  #[arg(long, value_name = "FPS")]
  pub fps: Option<f64>,

  /// 证据图像标题所用的 TTF 字体（缺省使用内置的 DejaVu Sans）
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 检测失败时跳过该帧而不是终止
  #[arg(long)]
  pub skip_detector_errors: bool,

  /// 最大读取帧数（0 表示无限制）
  #[arg(long, default_value = "0", value_name = "COUNT")]
  pub max_frames: u64,
}

impl Args {
  pub fn pipeline_config(&self) -> PipelineConfig {
    PipelineConfig {
      sample_stride: self.stride,
      detection_confidence: self.confidence,
      track_confidence: self.track_confidence,
      violation_class: self.violation_class,
      plate_region: PlateRegionConfig {
        margin: self.plate_margin,
        depth: self.plate_depth,
      },
      min_plate_chars: self.min_plate_chars,
      fps_override: self.fps,
      detector_errors: if self.skip_detector_errors {
        DetectorErrorPolicy::SkipFrame
      } else {
        DetectorErrorPolicy::Abort
      },
      max_frames: (self.max_frames > 0).then_some(self.max_frames),
    }
  }
}
