// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect/morphology.rs - 掩码闭运算
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

use imageproc::{distance_transform::Norm, morphology::close};

use crate::detect::Mask;

// LInf 范数半径 1 即 3x3 方形结构元
const CLOSE_RADIUS: u8 = 1;

/// 对掩码执行 `iterations` 次 3x3 闭运算（先膨胀后腐蚀），0 次时原样返回
pub fn close_mask(mask: Mask, iterations: u32) -> Mask {
  (0..iterations).fold(mask, |mask, _| close(&mask, Norm::LInf, CLOSE_RADIUS))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::color_mask::{MASK_CLEAR, MASK_SET};

  fn solid_rect(width: u32, height: u32, x0: u32, y0: u32, x1: u32, y1: u32) -> Mask {
    Mask::from_fn(width, height, |x, y| {
      if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
        MASK_SET
      } else {
        MASK_CLEAR
      }
    })
  }

  #[test]
  fn zero_iterations_is_identity() {
    let mask = solid_rect(10, 10, 2, 2, 6, 6);
    assert_eq!(close_mask(mask.clone(), 0), mask);
  }

  #[test]
  fn fills_single_pixel_hole() {
    let mut mask = solid_rect(12, 12, 3, 3, 9, 9);
    mask.put_pixel(5, 5, MASK_CLEAR);
    let closed = close_mask(mask, 1);
    assert_eq!(*closed.get_pixel(5, 5), MASK_SET);
  }

  #[test]
  fn solid_region_is_unchanged() {
    let mask = solid_rect(20, 20, 4, 5, 15, 12);
    assert_eq!(close_mask(mask.clone(), 1), mask);
    assert_eq!(close_mask(mask.clone(), 3), mask);
  }

  #[test]
  fn idempotent_once_gaps_are_filled() {
    let mut mask = solid_rect(16, 16, 2, 2, 14, 14);
    mask.put_pixel(7, 7, MASK_CLEAR);
    let once = close_mask(mask, 1);
    assert_eq!(close_mask(once.clone(), 1), once);
  }
}
