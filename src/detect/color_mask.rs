// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect/color_mask.rs - HSV 颜色掩码
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

use image::{GrayImage, Luma, Rgb};

use crate::{detect::DetectError, frame::Frame};

/// 二值掩码，命中像素为 255，其余为 0
pub type Mask = GrayImage;

pub const MASK_SET: Luma<u8> = Luma([255]);
pub const MASK_CLEAR: Luma<u8> = Luma([0]);

/// 8 位 HSV 颜色，色相取值 [0, 180)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hsv {
  pub h: u8,
  pub s: u8,
  pub v: u8,
}

impl From<Rgb<u8>> for Hsv {
  fn from(Rgb([r, g, b]): Rgb<u8>) -> Self {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = (max - min) as f32;

    let s = if max == 0 {
      0.0
    } else {
      diff * 255.0 / max as f32
    };

    let (r, g, b) = (r as f32, g as f32, b as f32);
    let mut h = if diff == 0.0 {
      0.0
    } else if max as f32 == r {
      60.0 * (g - b) / diff
    } else if max as f32 == g {
      120.0 + 60.0 * (b - r) / diff
    } else {
      240.0 + 60.0 * (r - g) / diff
    };
    if h < 0.0 {
      h += 360.0;
    }

    // 359.x 度四舍五入后会落到 180，折回 0
    let h = (h / 2.0).round() as u16 % 180;

    Self {
      h: h as u8,
      s: s.round() as u8,
      v: max,
    }
  }
}

/// HSV 颜色带，上下界均为闭区间
///
/// 上界取 `u16` 以便用 256 表示“不设上限”。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBand {
  pub hue_min: u16,
  pub hue_max: u16,
  pub sat_min: u16,
  pub sat_max: u16,
  pub val_min: u16,
  pub val_max: u16,
}

impl Default for ColorBand {
  fn default() -> Self {
    Self {
      hue_min: 30,
      hue_max: 180,
      sat_min: 80,
      sat_max: 256,
      val_min: 50,
      val_max: 256,
    }
  }
}

impl ColorBand {
  pub fn contains(&self, hsv: Hsv) -> bool {
    let in_range = |value: u8, min: u16, max: u16| (min..=max).contains(&(value as u16));
    in_range(hsv.h, self.hue_min, self.hue_max)
      && in_range(hsv.s, self.sat_min, self.sat_max)
      && in_range(hsv.v, self.val_min, self.val_max)
  }
}

/// 将帧按颜色带阈值化为二值掩码
pub fn extract_mask(frame: &Frame, band: &ColorBand) -> Result<Mask, DetectError> {
  if frame.is_empty() {
    return Err(DetectError::InvalidInput {
      width: frame.width(),
      height: frame.height(),
    });
  }

  let image = &frame.image;
  Ok(GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
    if band.contains(Hsv::from(*image.get_pixel(x, y))) {
      MASK_SET
    } else {
      MASK_CLEAR
    }
  }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::RgbImage;

  fn hsv(r: u8, g: u8, b: u8) -> Hsv {
    Hsv::from(Rgb([r, g, b]))
  }

  // 线性同余生成器，测试中用来产生确定的伪随机像素
  fn noise_frame(width: u32, height: u32, mut seed: u32) -> Frame {
    let image = RgbImage::from_fn(width, height, |_, _| {
      let mut next = || {
        seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        (seed >> 24) as u8
      };
      Rgb([next(), next(), next()])
    });
    Frame::from(image)
  }

  fn count_set(mask: &Mask) -> usize {
    mask.pixels().filter(|p| p[0] != 0).count()
  }

  #[test]
  fn hsv_primary_colors() {
    assert_eq!(hsv(255, 0, 0), Hsv { h: 0, s: 255, v: 255 });
    assert_eq!(hsv(0, 255, 0), Hsv { h: 60, s: 255, v: 255 });
    assert_eq!(hsv(0, 0, 255), Hsv { h: 120, s: 255, v: 255 });
    assert_eq!(hsv(0, 0, 0), Hsv { h: 0, s: 0, v: 0 });
    assert_eq!(hsv(128, 128, 128), Hsv { h: 0, s: 0, v: 128 });
  }

  #[test]
  fn hsv_hue_stays_below_180() {
    // 色相接近 360 度
    let c = hsv(255, 0, 1);
    assert!(c.h < 180);
  }

  #[test]
  fn mask_marks_green_only() {
    let mut image = RgbImage::new(4, 2);
    image.put_pixel(1, 0, Rgb([0, 255, 0]));
    image.put_pixel(3, 1, Rgb([0, 200, 40]));
    image.put_pixel(2, 1, Rgb([255, 0, 0]));
    let mask = extract_mask(&Frame::from(image), &ColorBand::default()).unwrap();

    assert_eq!(mask.dimensions(), (4, 2));
    assert_eq!(*mask.get_pixel(1, 0), MASK_SET);
    assert_eq!(*mask.get_pixel(3, 1), MASK_SET);
    assert_eq!(*mask.get_pixel(2, 1), MASK_CLEAR);
    assert_eq!(*mask.get_pixel(0, 0), MASK_CLEAR);
  }

  #[test]
  fn bounds_are_inclusive() {
    let color = hsv(0, 255, 0);
    let band = ColorBand {
      hue_min: color.h as u16,
      hue_max: color.h as u16,
      sat_min: color.s as u16,
      sat_max: color.s as u16,
      val_min: color.v as u16,
      val_max: color.v as u16,
    };
    assert!(band.contains(color));
  }

  #[test]
  fn empty_frame_is_invalid_input() {
    let frame = Frame::from(RgbImage::new(0, 0));
    assert_eq!(
      extract_mask(&frame, &ColorBand::default()),
      Err(DetectError::InvalidInput {
        width: 0,
        height: 0
      })
    );
  }

  #[test]
  fn widening_bounds_never_removes_pixels() {
    let frame = noise_frame(32, 24, 7);
    let narrow = ColorBand {
      hue_min: 40,
      hue_max: 90,
      sat_min: 100,
      sat_max: 200,
      val_min: 80,
      val_max: 220,
    };
    let base = extract_mask(&frame, &narrow).unwrap();

    let widened = [
      ColorBand { hue_min: 0, ..narrow },
      ColorBand { hue_max: 180, ..narrow },
      ColorBand { sat_min: 0, ..narrow },
      ColorBand { sat_max: 256, ..narrow },
      ColorBand { val_min: 0, ..narrow },
      ColorBand { val_max: 256, ..narrow },
    ];

    for band in widened {
      let wider = extract_mask(&frame, &band).unwrap();
      for (a, b) in base.pixels().zip(wider.pixels()) {
        assert!(a[0] == 0 || b[0] != 0, "widening {band:?} removed a pixel");
      }
      assert!(count_set(&wider) >= count_set(&base));
    }
  }
}
