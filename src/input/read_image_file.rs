// 该文件是 Retrosight （回光） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  input::{Acquisition, FrameSource},
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 静态图片输入
///
/// `image:///path/to/frame.png` 只产出一帧；加上 `?repeat` 则反复产出同一帧。
pub struct ImageFileInput {
  image: Option<RgbImage>,
  repeat: bool,
  index: u64,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url.path();
    let image = ImageReader::open(path)?.decode()?.to_rgb8();
    info!("图像: {}x{}", image.width(), image.height());

    let repeat = url.query_pairs().any(|(k, _)| k == "repeat");

    Ok(Self::from_image(image).with_repeat(repeat))
  }
}

impl ImageFileInput {
  pub fn from_image(image: RgbImage) -> Self {
    Self {
      image: Some(image),
      repeat: false,
      index: 0,
    }
  }

  pub fn with_repeat(mut self, repeat: bool) -> Self {
    self.repeat = repeat;
    self
  }
}

impl FrameSource for ImageFileInput {
  fn next_frame(&mut self) -> Acquisition {
    let image = if self.repeat {
      self.image.clone()
    } else {
      self.image.take()
    };

    match image {
      Some(image) => {
        let frame = Frame::from(image).with_index(self.index, 0);
        self.index += 1;
        Acquisition::Frame(frame)
      }
      None => Acquisition::EndOfStream,
    }
  }
}
