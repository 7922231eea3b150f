// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect/pipeline.rs - 单帧检测流水线
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

use tracing::{debug, info, warn};

use crate::{
  detect::{
    BandConfig, BandScan, CameraGeometry, ColorBand, DetectError, DetectionResult, Detector,
    ProjectionVector, RangeError, classify_bands, close_mask, estimate_range, extract_mask,
  },
  frame::Frame,
};

const INCHES_PER_FOOT: f64 = 12.0;

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
  pub color: ColorBand,
  /// 闭运算次数，0 表示跳过
  pub close_iterations: u32,
  pub bands: BandConfig,
  pub geometry: CameraGeometry,
  pub range_enabled: bool,
}

impl Default for DetectorConfig {
  fn default() -> Self {
    Self {
      color: ColorBand::default(),
      close_iterations: 0,
      bands: BandConfig::default(),
      geometry: CameraGeometry::default(),
      range_enabled: true,
    }
  }
}

/// 掩码、闭运算、行投影、分带、测距依次执行
#[derive(Debug, Clone, Default)]
pub struct TargetDetector {
  config: DetectorConfig,
}

impl TargetDetector {
  pub fn new(config: DetectorConfig) -> Self {
    Self { config }
  }

  /// 掩码与行投影，掩码在此处释放
  pub fn project(&self, frame: &Frame) -> Result<ProjectionVector, DetectError> {
    let mask = extract_mask(frame, &self.config.color)?;
    let mask = close_mask(mask, self.config.close_iterations);
    Ok(ProjectionVector::from(&mask))
  }

  fn range_for(&self, scan: &BandScan, height: usize) -> Result<f64, RangeError> {
    let narrow = scan.narrow.ok_or(RangeError::NoTarget)?;
    estimate_range(narrow.start, height, &self.config.geometry)
  }
}

impl Detector for TargetDetector {
  type Input = Frame;
  type Output = DetectionResult;
  type Error = DetectError;

  fn detect(&self, frame: &Frame) -> Result<DetectionResult, DetectError> {
    let projection = self.project(frame)?;
    let scan = classify_bands(&projection, &self.config.bands);

    let range = if self.config.range_enabled {
      match self.range_for(&scan, projection.len()) {
        Ok(range) => {
          info!(
            "计算距离: {:.2} 英寸, 即 {:.2} 英尺",
            range,
            range / INCHES_PER_FOOT
          );
          Some(range)
        }
        Err(RangeError::NoTarget) => {
          info!("未找到用于测距的目标");
          None
        }
        Err(e) => {
          warn!("距离无效: {}", e);
          None
        }
      }
    } else {
      None
    };

    if scan.is_hot() {
      info!("第 {} 帧: 目标为热", frame.index);
    } else {
      info!("第 {} 帧: 目标不为热", frame.index);
    }
    debug!("投影行数 {}, 检测结果 {:?}", projection.len(), scan);

    Ok(DetectionResult {
      is_hot: scan.is_hot(),
      range,
      wide: scan.wide,
      narrow: scan.narrow,
    })
  }
}
