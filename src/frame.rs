// 该文件是 Retrosight （回光） 项目的一部分。
// src/frame.rs - RGB 帧定义
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

use image::RgbImage;

const RGB_CHANNELS: usize = 3;

/// 帧数据
///
/// 由采集端产生，流水线只读不写。
#[derive(Debug, Clone)]
pub struct Frame {
  /// RGB 图像数据（HWC 排列）
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 时间戳（毫秒）
  pub timestamp_ms: u64,
}

impl From<RgbImage> for Frame {
  fn from(image: RgbImage) -> Self {
    Self {
      image,
      index: 0,
      timestamp_ms: 0,
    }
  }
}

impl Frame {
  pub fn with_index(mut self, index: u64, timestamp_ms: u64) -> Self {
    self.index = index;
    self.timestamp_ms = timestamp_ms;
    self
  }

  /// 由 HWC 排列的 RGB 原始数据创建帧，长度不匹配时返回 `None`
  pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
    if data.len() != RGB_CHANNELS * width as usize * height as usize {
      return None;
    }
    RgbImage::from_raw(width, height, data).map(Self::from)
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  /// 宽或高为零的帧无法处理
  pub fn is_empty(&self) -> bool {
    self.width() == 0 || self.height() == 0
  }
}
