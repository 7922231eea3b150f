// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect.rs - 目标检测
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

//! # 反光目标检测
//!
//! 每帧依次执行：
//! 1. 颜色掩码提取（HSV 阈值）
//! 2. 形态学闭运算（可选）
//! 3. 行投影
//! 4. 宽/窄目标带分类
//! 5. 距离估计
//!
//! 除只读配置外，帧与帧之间不保留任何状态。

use thiserror::Error;

pub mod band;
pub mod color_mask;
pub mod morphology;
pub mod pipeline;
pub mod projection;
pub mod range;

pub use self::band::{BandConfig, BandKind, BandScan, TargetBand, classify_bands};
pub use self::color_mask::{ColorBand, Hsv, Mask, extract_mask};
pub use self::morphology::close_mask;
pub use self::pipeline::{DetectorConfig, TargetDetector};
pub use self::projection::ProjectionVector;
pub use self::range::{CameraGeometry, RangeError, estimate_range};

pub trait Detector {
  type Input;
  type Output;
  type Error;

  fn detect(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
  #[error("输入帧无效: {width}x{height}")]
  InvalidInput { width: u32, height: u32 },
}

/// 单帧检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
  /// 是否找到宽带（热目标）
  pub is_hot: bool,
  /// 斜距，无有效距离时为 `None`
  pub range: Option<f64>,
  pub wide: Option<TargetBand>,
  pub narrow: Option<TargetBand>,
}

impl DetectionResult {
  pub fn not_found() -> Self {
    Self {
      is_hot: false,
      range: None,
      wide: None,
      narrow: None,
    }
  }

  /// 是否找到窄带
  pub fn found(&self) -> bool {
    self.narrow.is_some()
  }
}
