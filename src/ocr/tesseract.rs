// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/ocr/tesseract.rs - Tesseract 车牌识别
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

//! URL 形如 `tesseract:///usr/share/tessdata?lang=eng&psm=7&whitelist=ABC0123`。
//!
//! 路径为 tessdata 目录，`lang` 缺省 `eng`，`psm` 缺省 7（单行文本）。

use std::io::Cursor;

use image::{GrayImage, ImageFormat};
use leptess::{LepTess, Variable};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use super::{OcrError, PlateReader};
use crate::{FromUrl, FromUrlWithScheme, query_value};

const DEFAULT_LANG: &str = "eng";
const DEFAULT_PAGE_SEG_MODE: u32 = 7;

#[derive(Error, Debug)]
pub enum TesseractReaderError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("Tesseract 初始化失败: {0}")]
  InitError(String),
  #[error("设置 Tesseract 参数失败: {0}")]
  VariableError(String),
  #[error("图像编码失败: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("Tesseract 识别失败: {0}")]
  RecognizeError(String),
}

pub struct TesseractReader {
  api: LepTess,
}

impl FromUrlWithScheme for TesseractReader {
  const SCHEME: &'static str = "tesseract";
}

impl FromUrl for TesseractReader {
  type Error = OcrError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TesseractReaderError::SchemeMismatch.into());
    }

    let data_path = match url.path() {
      "" | "/" => None,
      path => Some(path),
    };
    let lang = query_value::<String>(url, "lang").unwrap_or_else(|| DEFAULT_LANG.to_string());
    let psm = query_value(url, "psm").unwrap_or(DEFAULT_PAGE_SEG_MODE);
    let whitelist = query_value::<String>(url, "whitelist");

    Ok(Self::new(data_path, &lang, psm, whitelist.as_deref())?)
  }
}

impl TesseractReader {
  pub fn new(
    data_path: Option<&str>,
    lang: &str,
    page_seg_mode: u32,
    whitelist: Option<&str>,
  ) -> Result<Self, TesseractReaderError> {
    let mut api = LepTess::new(data_path, lang)
      .map_err(|e| TesseractReaderError::InitError(format!("{:?}", e)))?;
    api
      .set_variable(Variable::TesseditPagesegMode, &page_seg_mode.to_string())
      .map_err(|e| TesseractReaderError::VariableError(format!("{:?}", e)))?;
    if let Some(whitelist) = whitelist {
      api
        .set_variable(Variable::TesseditCharWhitelist, whitelist)
        .map_err(|e| TesseractReaderError::VariableError(format!("{:?}", e)))?;
    }
    info!("Tesseract 已初始化: lang={}, psm={}", lang, page_seg_mode);
    Ok(Self { api })
  }
}

impl PlateReader for TesseractReader {
  type Error = TesseractReaderError;

  fn read_lines(&mut self, crop: &GrayImage) -> Result<Vec<String>, Self::Error> {
    let mut encoded = Cursor::new(Vec::new());
    crop.write_to(&mut encoded, ImageFormat::Png)?;

    self
      .api
      .set_image_from_mem(encoded.get_ref())
      .map_err(|e| TesseractReaderError::RecognizeError(format!("{:?}", e)))?;
    self.api.set_source_resolution(70);
    let text = self
      .api
      .get_utf8_text()
      .map_err(|e| TesseractReaderError::RecognizeError(e.to_string()))?;
    debug!("Tesseract 输出: {:?}", text);

    Ok(
      text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect(),
    )
  }
}
