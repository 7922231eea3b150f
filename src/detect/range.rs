// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect/range.rs - 斜距估计
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

use thiserror::Error;

// 正切奇异判定阈值
const SINGULARITY_EPSILON: f64 = 1e-6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
  #[error("未找到用于测距的目标")]
  NoTarget,
  #[error("目标行 {row} 超出图像高度 {height}")]
  RowOutOfBounds { row: usize, height: usize },
  #[error("俯仰角 {theta_offset:.4}° 接近正切奇点")]
  Singularity { theta_offset: f64 },
}

/// 相机安装几何参数，启动时给定，运行期只读
///
/// 角度单位为度，高度单位任意但需一致，距离结果使用相同单位。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraGeometry {
  /// 相机视场角，沿图像行方向换算
  pub fov_deg: f64,
  /// 安装俯仰角偏移
  pub pitch_offset_deg: f64,
  /// 相机安装高度
  pub mount_height: f64,
  /// 目标高度
  pub target_height: f64,
}

impl Default for CameraGeometry {
  fn default() -> Self {
    Self {
      fov_deg: 30.0,
      pitch_offset_deg: 10.0,
      mount_height: 7.0,
      target_height: 68.0,
    }
  }
}

impl CameraGeometry {
  /// 目标行在相机光轴之上的仰角（度）
  pub fn elevation_deg(&self, row: usize, height: usize) -> f64 {
    let height = height as f64;
    let theta = (height - row as f64) / height * self.fov_deg;
    let angle_offset = self.fov_deg / 2.0 - self.pitch_offset_deg;
    theta - angle_offset
  }
}

/// 由窄带起始行计算到目标的斜距
pub fn estimate_range(
  row: usize,
  height: usize,
  geometry: &CameraGeometry,
) -> Result<f64, RangeError> {
  if height == 0 || row >= height {
    return Err(RangeError::RowOutOfBounds { row, height });
  }

  let theta_offset = geometry.elevation_deg(row, height);
  let radians = theta_offset.to_radians();

  // cos 接近 0 为 ±90°，tan 接近 0 时除数为 0
  let tan = radians.tan();
  if radians.cos().abs() < SINGULARITY_EPSILON || tan.abs() < SINGULARITY_EPSILON {
    return Err(RangeError::Singularity { theta_offset });
  }

  let range = (geometry.target_height - geometry.mount_height) / tan;
  if !range.is_finite() {
    return Err(RangeError::Singularity { theta_offset });
  }
  Ok(range)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn elevation_follows_row_position() {
    let geometry = CameraGeometry::default();
    // 最顶行: theta = fov, 偏移 = 15 - 10
    assert!((geometry.elevation_deg(0, 100) - 25.0).abs() < 1e-9);
    assert!((geometry.elevation_deg(50, 100) - 10.0).abs() < 1e-9);
  }

  #[test]
  fn range_for_known_geometry() {
    let geometry = CameraGeometry::default();
    let range = estimate_range(50, 100, &geometry).unwrap();
    let expected = 61.0 / 10f64.to_radians().tan();
    assert!((range - expected).abs() < 1e-9);
    assert_eq!(range as i64, 345);
  }

  #[test]
  fn zero_offset_is_singular() {
    // 中间行的 theta_offset 恰好等于俯仰偏移
    let geometry = CameraGeometry {
      pitch_offset_deg: 0.0,
      ..CameraGeometry::default()
    };
    assert!(matches!(
      estimate_range(50, 100, &geometry),
      Err(RangeError::Singularity { .. })
    ));
  }

  #[test]
  fn right_angle_offset_is_singular() {
    for pitch in [90.0, -90.0] {
      let geometry = CameraGeometry {
        pitch_offset_deg: pitch,
        ..CameraGeometry::default()
      };
      let result = estimate_range(50, 100, &geometry);
      assert!(
        matches!(result, Err(RangeError::Singularity { .. })),
        "pitch {pitch}: {result:?}"
      );
    }
  }

  #[test]
  fn row_outside_image_is_rejected() {
    let geometry = CameraGeometry::default();
    assert_eq!(
      estimate_range(100, 100, &geometry),
      Err(RangeError::RowOutOfBounds {
        row: 100,
        height: 100
      })
    );
    assert!(estimate_range(0, 0, &geometry).is_err());
  }
}
