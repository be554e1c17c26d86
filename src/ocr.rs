// 该文件是 Toukui （头盔巡查） 项目的一部分。
// src/ocr.rs - 车牌文字识别
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

use image::GrayImage;
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 文字识别协作者。
///
/// 输入为已裁剪的灰度图，返回识别出的各行文字（可能为空）。任何失败都以
/// `Err` 返回，调用方负责把它降级为哨兵值，不得因此中止运行。
pub trait PlateReader {
  type Error: std::fmt::Display;

  fn read_lines(&mut self, crop: &GrayImage) -> Result<Vec<String>, Self::Error>;
}

impl<T: PlateReader + ?Sized> PlateReader for Box<T> {
  type Error = T::Error;

  fn read_lines(&mut self, crop: &GrayImage) -> Result<Vec<String>, Self::Error> {
    (**self).read_lines(crop)
  }
}

/// 不做识别，所有车牌都记为不可读。URL 为 `none:`。
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReader;

impl FromUrlWithScheme for NoopReader {
  const SCHEME: &'static str = "none";
}

impl FromUrl for NoopReader {
  type Error = OcrError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(OcrError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(NoopReader)
  }
}

impl PlateReader for NoopReader {
  type Error = std::convert::Infallible;

  fn read_lines(&mut self, _crop: &GrayImage) -> Result<Vec<String>, Self::Error> {
    Ok(Vec::new())
  }
}

#[cfg(feature = "ocr_tesseract")]
mod tesseract;
#[cfg(feature = "ocr_tesseract")]
pub use self::tesseract::{TesseractReader, TesseractReaderError};

#[derive(Error, Debug)]
pub enum OcrError {
  #[cfg(feature = "ocr_tesseract")]
  #[error("Tesseract 错误: {0}")]
  TesseractReaderError(#[from] TesseractReaderError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OcrWrapper {
  Noop(NoopReader),
  #[cfg(feature = "ocr_tesseract")]
  Tesseract(Box<TesseractReader>),
}

impl FromUrl for OcrWrapper {
  type Error = OcrError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() == NoopReader::SCHEME {
      return Ok(OcrWrapper::Noop(NoopReader::from_url(url)?));
    }
    #[cfg(feature = "ocr_tesseract")]
    {
      if url.scheme() == TesseractReader::SCHEME {
        let reader = TesseractReader::from_url(url)?;
        return Ok(OcrWrapper::Tesseract(Box::new(reader)));
      }
    }
    Err(OcrError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl PlateReader for OcrWrapper {
  type Error = OcrError;

  fn read_lines(&mut self, crop: &GrayImage) -> Result<Vec<String>, Self::Error> {
    match self {
      OcrWrapper::Noop(reader) => match reader.read_lines(crop) {
        Ok(lines) => Ok(lines),
        Err(never) => match never {},
      },
      #[cfg(feature = "ocr_tesseract")]
      OcrWrapper::Tesseract(reader) => reader.read_lines(crop).map_err(OcrError::from),
    }
  }
}
