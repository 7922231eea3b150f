// 该文件是 Retrosight （回光） 项目的一部分。
// src/output/draw.rs - 目标带可视化
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

use image::{Rgb, RgbImage};
use imageproc::{drawing::draw_hollow_rect_mut, rect::Rect};

use crate::{
  detect::{BandKind, DetectionResult, TargetBand},
  frame::Frame,
};

const WIDE_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const NARROW_COLOR: [u8; 3] = [0, 255, 0]; // 绿色
const BORDER_THICKNESS: u32 = 2;

pub struct Draw {
  wide_color: [u8; 3],
  narrow_color: [u8; 3],
  thickness: u32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      wide_color: WIDE_COLOR,
      narrow_color: NARROW_COLOR,
      thickness: BORDER_THICKNESS,
    }
  }
}

impl Draw {
  // 目标带横跨整幅图像宽度
  fn draw_band(&self, image: &mut RgbImage, band: &TargetBand) {
    let (width, height) = image.dimensions();
    if width == 0 || band.start as u32 >= height {
      return;
    }
    let color = match band.kind {
      BandKind::Wide => self.wide_color,
      BandKind::Narrow => self.narrow_color,
    };

    let end = (band.end as u32).min(height);
    for t in 0..self.thickness {
      let top = band.start as u32 + t;
      let rows = end.saturating_sub(top + t);
      let cols = width.saturating_sub(2 * t);
      if rows == 0 || cols == 0 {
        break;
      }
      let rect = Rect::at(t as i32, top as i32).of_size(cols, rows);
      draw_hollow_rect_mut(image, rect, Rgb(color));
    }
  }

  /// 在帧的副本上标出宽带与窄带
  pub fn draw_detection(&self, frame: &Frame, result: &DetectionResult) -> RgbImage {
    let mut image = frame.image.clone();
    for band in result.wide.iter().chain(result.narrow.iter()) {
      self.draw_band(&mut image, band);
    }
    image
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn outlines_wide_band_in_red() {
    let frame = Frame::from(RgbImage::new(20, 20));
    let result = DetectionResult {
      is_hot: true,
      range: None,
      wide: Some(TargetBand {
        kind: BandKind::Wide,
        start: 5,
        end: 10,
      }),
      narrow: None,
    };
    let image = Draw::default().draw_detection(&frame, &result);

    assert_eq!(*image.get_pixel(10, 5), Rgb(WIDE_COLOR));
    assert_eq!(*image.get_pixel(0, 7), Rgb(WIDE_COLOR));
    assert_eq!(*image.get_pixel(10, 9), Rgb(WIDE_COLOR));
    assert_eq!(*image.get_pixel(10, 15), Rgb([0, 0, 0]));
    // 原始帧不受影响
    assert_eq!(*frame.image.get_pixel(10, 5), Rgb([0, 0, 0]));
  }
}
