// 该文件是 Retrosight （回光） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::Path;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  detect::DetectionResult,
  frame::Frame,
  output::{Render, draw::Draw},
};

/// 每帧覆盖写同一个文件，用于现场调试
///
/// 默认保存标注后的帧，`image:///tmp/orig.png?raw` 保存原始帧。
pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
  raw: bool,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      draw: Draw::default(),
      raw: uri.query_pairs().any(|(k, _)| k == "raw"),
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image
      .save(&self.path)
      .map_err(SaveImageFileError::ImageError)?;

    debug!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render<Frame, DetectionResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    let image = if self.raw {
      frame.image.clone()
    } else {
      self.draw.draw_detection(frame, result)
    };
    self.save_image(image)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::{BandKind, TargetBand};
  use image::{Rgb, RgbImage};

  fn hot_result() -> DetectionResult {
    DetectionResult {
      is_hot: true,
      range: None,
      wide: Some(TargetBand {
        kind: BandKind::Wide,
        start: 1,
        end: 4,
      }),
      narrow: None,
    }
  }

  #[test]
  fn writes_annotated_frame() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("debug").join("orig.png");
    let url = Url::parse(&format!("image://{}", path.display())).unwrap();

    let output = SaveImageFileOutput::from_url(&url).unwrap();
    let frame = Frame::from(RgbImage::new(8, 6));
    output
      .render_result(&frame, &DetectionResult::not_found())
      .unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (8, 6));
  }

  #[test]
  fn raw_query_saves_unannotated_frame() {
    let dir = tempfile::tempdir().unwrap();
    let annotated_path = dir.path().join("annotated.png");
    let raw_path = dir.path().join("orig.png");
    let frame = Frame::from(RgbImage::new(8, 6));

    let annotated_url = Url::parse(&format!("image://{}", annotated_path.display())).unwrap();
    let raw_url = Url::parse(&format!("image://{}?raw", raw_path.display())).unwrap();
    let annotated = SaveImageFileOutput::from_url(&annotated_url).unwrap();
    let raw = SaveImageFileOutput::from_url(&raw_url).unwrap();
    annotated.render_result(&frame, &hot_result()).unwrap();
    raw.render_result(&frame, &hot_result()).unwrap();

    let annotated = image::open(&annotated_path).unwrap().to_rgb8();
    assert_ne!(*annotated.get_pixel(4, 1), Rgb([0, 0, 0]));
    let raw = image::open(&raw_path).unwrap().to_rgb8();
    assert!(raw.pixels().all(|p| *p == Rgb([0, 0, 0])));
  }
}
