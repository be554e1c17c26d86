// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/output/directory_report.rs - 目录输出：证据图像 + 违规日志
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

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{debug, info};

use super::{EvidenceSink, OutputError};
use crate::pipeline::{RunReport, RunStatus, ViolationRecord};

const CSV_HEADER: [&str; 5] = [
  "Track ID",
  "Timestamp",
  "Violation",
  "Vehicle Number (Detected)",
  "Evidence",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Csv,
  /// 每行一个 JSON 对象
  JsonLines,
}

impl LogFormat {
  /// `.jsonl` 与 `.json` 为 JSON Lines，其余一律 CSV
  pub fn from_path(path: &Path) -> Self {
    match path.extension().and_then(|ext| ext.to_str()) {
      Some("jsonl") | Some("json") => LogFormat::JsonLines,
      _ => LogFormat::Csv,
    }
  }
}

/// 证据图像写入 `evidence_dir`，违规日志写入 `log_path`。
///
/// 记录先缓存在内存中，运行正常结束（`finish`）时才一次性写出日志；中途出错
/// 的运行与没有违规的运行都不会留下日志文件。
pub struct DirectoryReport {
  evidence_dir: PathBuf,
  log_path: PathBuf,
  format: LogFormat,
  pending: Vec<ViolationRecord>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> OutputError + '_ {
  move |source| OutputError::IoError {
    path: path.to_path_buf(),
    source,
  }
}

impl DirectoryReport {
  pub fn new(evidence_dir: &Path, log_path: &Path) -> Result<Self, OutputError> {
    fs::create_dir_all(evidence_dir).map_err(io_error(evidence_dir))?;
    Ok(Self {
      evidence_dir: evidence_dir.to_path_buf(),
      log_path: log_path.to_path_buf(),
      format: LogFormat::from_path(log_path),
      pending: Vec::new(),
    })
  }

  pub fn log_path(&self) -> &Path {
    &self.log_path
  }

  pub fn evidence_dir(&self) -> &Path {
    &self.evidence_dir
  }

  fn write_log(&self) -> Result<(), OutputError> {
    if let Some(parent) = self.log_path.parent().filter(|p| !p.as_os_str().is_empty()) {
      fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let file = File::create(&self.log_path).map_err(io_error(&self.log_path))?;
    let mut writer = BufWriter::new(file);

    match self.format {
      LogFormat::Csv => {
        writeln!(writer, "{}", csv_line(CSV_HEADER)).map_err(io_error(&self.log_path))?;
        for record in &self.pending {
          let line = csv_line([
            record.track_id.to_string(),
            record.timestamp.to_string(),
            record.violation.to_string(),
            record.plate_text.to_string(),
            record.evidence.display().to_string(),
          ]);
          writeln!(writer, "{}", line).map_err(io_error(&self.log_path))?;
        }
      }
      LogFormat::JsonLines => {
        for record in &self.pending {
          serde_json::to_writer(&mut writer, record)?;
          writeln!(writer).map_err(io_error(&self.log_path))?;
        }
      }
    }
    writer.flush().map_err(io_error(&self.log_path))
  }
}

impl EvidenceSink for DirectoryReport {
  type Error = OutputError;

  fn write_evidence(&mut self, name: &str, image: &RgbImage) -> Result<PathBuf, Self::Error> {
    let path = self.evidence_dir.join(name);
    image.save(&path)?;
    debug!("证据图像已保存: {}", path.display());
    Ok(path)
  }

  fn append_record(&mut self, record: &ViolationRecord) -> Result<(), Self::Error> {
    self.pending.push(record.clone());
    Ok(())
  }

  fn finish(&mut self, report: &RunReport) -> Result<(), Self::Error> {
    match report.status() {
      RunStatus::Violations(_) if !self.pending.is_empty() => {
        self.write_log()?;
        info!(
          "违规日志已写入 {}: {} 条记录",
          self.log_path.display(),
          self.pending.len()
        );
      }
      _ => info!("未发现违规，不生成日志"),
    }
    Ok(())
  }
}

/// 按 RFC 4180 拼一行 CSV：含逗号、引号或换行的字段加引号，引号加倍
fn csv_line<I, S>(fields: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  fields
    .into_iter()
    .map(|field| {
      let field = field.as_ref();
      if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
      } else {
        field.to_string()
      }
    })
    .collect::<Vec<_>>()
    .join(",")
}
