// 该文件是 Retrosight （回光） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::detect::{BandConfig, CameraGeometry, ColorBand, DetectorConfig};

pub const DEFAULT_TELEMETRY_URL: &str = "udp://10.36.37.2:1130";
const WIDE_RUN_FACTOR: u32 = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ArgsError {
  #[error("{channel} 阈值下界 {min} 大于上界 {max}")]
  EmptyColorRange {
    channel: &'static str,
    min: u16,
    max: u16,
  },
  #[error("平滑窗口必须至少为 1 行")]
  ZeroSmoothingWindow,
  #[error("宽带阈值 {wide} 小于窄带阈值 {narrow}")]
  WideBelowNarrow { wide: u32, narrow: u32 },
  #[error("窄带阈值 {0} 过大，推导的宽带阈值溢出")]
  RunThresholdOverflow(u32),
}

/// HSV 颜色阈值，上界取 256 表示不设上限
#[derive(clap::Args, Debug, Clone)]
pub struct ColorArgs {
  #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u16).range(0..=256))]
  pub hue_min: u16,
  #[arg(long, default_value_t = 180, value_parser = clap::value_parser!(u16).range(0..=256))]
  pub hue_max: u16,
  #[arg(long, default_value_t = 80, value_parser = clap::value_parser!(u16).range(0..=256))]
  pub sat_min: u16,
  #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u16).range(0..=256))]
  pub sat_max: u16,
  #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u16).range(0..=256))]
  pub val_min: u16,
  #[arg(long, default_value_t = 256, value_parser = clap::value_parser!(u16).range(0..=256))]
  pub val_max: u16,
}

impl ColorArgs {
  pub fn color_band(&self) -> Result<ColorBand, ArgsError> {
    for (channel, min, max) in [
      ("H", self.hue_min, self.hue_max),
      ("S", self.sat_min, self.sat_max),
      ("V", self.val_min, self.val_max),
    ] {
      if min > max {
        return Err(ArgsError::EmptyColorRange { channel, min, max });
      }
    }
    Ok(ColorBand {
      hue_min: self.hue_min,
      hue_max: self.hue_max,
      sat_min: self.sat_min,
      sat_max: self.sat_max,
      val_min: self.val_min,
      val_max: self.val_max,
    })
  }
}

#[derive(clap::Args, Debug, Clone)]
pub struct BandArgs {
  /// 窄带像素阈值
  #[arg(long, default_value_t = 10, value_name = "PIXELS")]
  pub min_run: u32,
  /// 宽带像素阈值，默认取窄带阈值的 4 倍
  #[arg(long, value_name = "PIXELS")]
  pub wide_run: Option<u32>,
  /// 平滑窗口行数
  #[arg(long, default_value_t = 5, value_name = "ROWS")]
  pub smoothing_window: usize,
  /// 掩码闭运算次数，0 表示关闭
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub close_iterations: u32,
}

impl BandArgs {
  pub fn band_config(&self) -> Result<BandConfig, ArgsError> {
    if self.smoothing_window == 0 {
      return Err(ArgsError::ZeroSmoothingWindow);
    }
    let wide = match self.wide_run {
      Some(wide) if wide < self.min_run => {
        return Err(ArgsError::WideBelowNarrow {
          wide,
          narrow: self.min_run,
        });
      }
      Some(wide) => wide,
      None => self
        .min_run
        .checked_mul(WIDE_RUN_FACTOR)
        .ok_or(ArgsError::RunThresholdOverflow(self.min_run))?,
    };
    Ok(
      BandConfig::with_min_run(self.min_run)
        .with_wide_run(wide)
        .with_smoothing_window(self.smoothing_window),
    )
  }
}

/// 相机安装参数，角度单位为度，高度单位为英寸
#[derive(clap::Args, Debug, Clone)]
pub struct GeometryArgs {
  #[arg(long, default_value_t = 30.0, value_name = "DEGREES")]
  pub fov: f64,
  #[arg(long, default_value_t = 10.0, value_name = "DEGREES", allow_hyphen_values = true)]
  pub pitch_offset: f64,
  #[arg(long, default_value_t = 7.0, value_name = "INCHES")]
  pub mount_height: f64,
  #[arg(long, default_value_t = 68.0, value_name = "INCHES")]
  pub target_height: f64,
  /// 关闭测距，DIST 恒为 -1
  #[arg(long)]
  pub disable_range: bool,
}

impl GeometryArgs {
  pub fn geometry(&self) -> CameraGeometry {
    CameraGeometry {
      fov_deg: self.fov,
      pitch_offset_deg: self.pitch_offset,
      mount_height: self.mount_height,
      target_height: self.target_height,
    }
  }
}

#[derive(clap::Args, Debug, Clone)]
pub struct DetectorArgs {
  #[command(flatten)]
  pub color: ColorArgs,
  #[command(flatten)]
  pub bands: BandArgs,
  #[command(flatten)]
  pub geometry: GeometryArgs,
}

impl DetectorArgs {
  pub fn into_config(self) -> Result<DetectorConfig, ArgsError> {
    Ok(DetectorConfig {
      color: self.color.color_band()?,
      close_iterations: self.bands.close_iterations,
      bands: self.bands.band_config()?,
      geometry: self.geometry.geometry(),
      range_enabled: !self.geometry.disable_range,
    })
  }
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutputArgs {
  /// 遥测目标地址
  #[arg(long, value_name = "URL", default_value = DEFAULT_TELEMETRY_URL)]
  pub telemetry: Url,
  /// 额外输出，可重复，如 image:///tmp/orig.png 或 folder:///var/log/retrosight
  #[arg(long = "record", value_name = "URL")]
  pub records: Vec<Url>,
}

impl OutputArgs {
  /// 遥测地址在前
  pub fn urls(&self) -> impl Iterator<Item = &Url> {
    std::iter::once(&self.telemetry).chain(self.records.iter())
  }
}

/// 连续模式的循环参数
#[derive(clap::Args, Debug, Clone)]
pub struct LoopArgs {
  /// 最多处理的帧数，不指定则一直运行
  #[arg(long, value_name = "COUNT")]
  pub frame_number: Option<u64>,
  /// 无帧可用时的重试间隔（毫秒）
  #[arg(long, default_value_t = 1000, value_name = "MILLIS")]
  pub stall_backoff_ms: u64,
}

impl LoopArgs {
  pub fn stall_backoff(&self) -> Duration {
    Duration::from_millis(self.stall_backoff_ms)
  }
}
