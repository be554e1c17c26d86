// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/main.rs - 项目主程序
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

mod args;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use toukui::{
  FromUrl,
  log_filter,
  input::InputWrapper,
  model::ModelWrapper,
  ocr::OcrWrapper,
  output::{DirectoryReport, EvidenceDraw},
  pipeline::{RunStatus, ViolationPipeline},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt().with_env_filter(log_filter()).init();

  let args = args::Args::parse();
  let config = args.pipeline_config();

  info!("输入来源: {}", args.input);
  info!("模型: {}", args.model);
  info!("车牌识别: {}", args.ocr);
  info!("违规日志: {}", args.log.display());
  info!("证据目录: {}", args.evidence_dir.display());

  let mut source = InputWrapper::from_url(&args.input)?;
  let tracker = ModelWrapper::from_url(&args.model)?;
  let reader = OcrWrapper::from_url(&args.ocr)?;
  let draw = match &args.font {
    Some(path) => EvidenceDraw::with_font_file(path)?,
    None => EvidenceDraw::default(),
  };

  let mut pipeline = ViolationPipeline::new(config, tracker, reader)?.with_draw(draw);
  let mut sink = DirectoryReport::new(&args.evidence_dir, &args.log)?;
  let report = pipeline.run(&mut source, &mut sink)?;

  let elapsed = report.finished_at - report.started_at;
  match report.status() {
    RunStatus::Violations(n) => {
      info!(
        "共发现 {} 起违规，日志: {}，证据: {}",
        n,
        sink.log_path().display(),
        sink.evidence_dir().display()
      );
    }
    RunStatus::NoViolations => info!("No violations detected."),
  }
  info!(
    "读取 {} 帧，抽检 {} 帧，跳过 {} 帧，耗时 {} ms",
    report.frames_read,
    report.frames_sampled,
    report.frames_skipped,
    elapsed.num_milliseconds()
  );

  Ok(())
}
