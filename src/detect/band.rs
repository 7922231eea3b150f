// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect/band.rs - 宽/窄目标带分类
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

//! 在行投影上扫描连续的高计数行。
//!
//! 计数达到 `wide_run_pixels` 的行属于宽带（热目标），介于
//! `min_run_pixels` 与 `wide_run_pixels` 之间的行属于窄带（用于测距）。
//! 每一行都需要借助前后 `smoothing_window` 行的均值确认，
//! 以排除单行噪声。每帧只记录第一个宽带与第一个窄带。

use tracing::debug;

use crate::detect::ProjectionVector;

const DEFAULT_MIN_RUN_PIXELS: u32 = 10;
const WIDE_RUN_FACTOR: u32 = 4;
const DEFAULT_SMOOTHING_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandConfig {
  /// 窄带像素阈值，行计数需严格大于该值
  pub min_run_pixels: u32,
  /// 宽带像素阈值，行计数需不小于该值
  pub wide_run_pixels: u32,
  /// 平滑窗口行数，取 0 时按 1 处理
  pub smoothing_window: usize,
}

impl Default for BandConfig {
  fn default() -> Self {
    Self::with_min_run(DEFAULT_MIN_RUN_PIXELS)
  }
}

impl BandConfig {
  /// 宽带阈值取窄带阈值的 4 倍，溢出时取 `u32::MAX`
  pub fn with_min_run(min_run_pixels: u32) -> Self {
    Self {
      min_run_pixels,
      wide_run_pixels: min_run_pixels.saturating_mul(WIDE_RUN_FACTOR),
      smoothing_window: DEFAULT_SMOOTHING_WINDOW,
    }
  }

  pub fn with_wide_run(mut self, wide_run_pixels: u32) -> Self {
    self.wide_run_pixels = wide_run_pixels;
    self
  }

  pub fn with_smoothing_window(mut self, smoothing_window: usize) -> Self {
    self.smoothing_window = smoothing_window;
    self
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BandKind {
  Wide,
  Narrow,
}

/// 目标带，行区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBand {
  pub kind: BandKind,
  pub start: usize,
  pub end: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct BandTracker {
  start: Option<usize>,
  last: Option<usize>,
}

impl BandTracker {
  fn record(&mut self, row: usize) {
    match self.start {
      None => self.start = Some(row),
      Some(_) => self.last = Some(row),
    }
  }

  // 未确认结束行时，带只包含起始行
  fn into_band(self, kind: BandKind) -> Option<TargetBand> {
    self.start.map(|start| TargetBand {
      kind,
      start,
      end: self.last.unwrap_or(start).max(start) + 1,
    })
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BandScan {
  pub wide: Option<TargetBand>,
  pub narrow: Option<TargetBand>,
}

impl BandScan {
  /// 找到宽带起点即为热目标，不要求找到结束行
  pub fn is_hot(&self) -> bool {
    self.wide.is_some()
  }

  pub fn found(&self) -> bool {
    self.narrow.is_some()
  }
}

/// 扫描行投影，返回第一个宽带和第一个窄带
///
/// 只扫描 `[w, H - w)` 内的行（`w` 为平滑窗口），靠近上下边缘的行
/// 没有完整的平均窗口。对每个计数超过 `min_run_pixels` 的行 `i`：
///
/// - 前向均值取 `[i, i + w)`，后向均值取 `(i - w, i]`；
/// - 宽行：未记录起点时要求前向均值不小于 `wide_run_pixels`，
///   之后的结束行要求后向均值不小于 `wide_run_pixels`；
/// - 窄行：起点和结束行都要求前向均值落在
///   `(min_run_pixels, wide_run_pixels)` 内。
///
/// 窄带结束行沿用前向均值而非后向均值，与宽带不对称。
/// 这会影响实际数据上的检测结果，保持现状。
pub fn classify_bands(projection: &ProjectionVector, config: &BandConfig) -> BandScan {
  let window = config.smoothing_window.max(1);
  let min_run = config.min_run_pixels as f64;
  let wide_run = config.wide_run_pixels as f64;

  let mut wide = BandTracker::default();
  let mut narrow = BandTracker::default();

  for (row, &count) in projection
    .as_slice()
    .iter()
    .enumerate()
    .take(projection.len().saturating_sub(window))
    .skip(window)
  {
    if count <= config.min_run_pixels {
      continue;
    }

    let (Some(avg_front), Some(avg_back)) = (
      projection.mean(row..row + window),
      projection.mean(row + 1 - window..row + 1),
    ) else {
      continue;
    };

    if count >= config.wide_run_pixels {
      let confirmed = match wide.start {
        None => avg_front >= wide_run,
        Some(_) => avg_back >= wide_run,
      };
      if confirmed {
        wide.record(row);
      }
    } else if avg_front > min_run && avg_front < wide_run {
      narrow.record(row);
    }
  }

  let scan = BandScan {
    wide: wide.into_band(BandKind::Wide),
    narrow: narrow.into_band(BandKind::Narrow),
  };
  debug!("目标带扫描结果: 宽带 {:?}, 窄带 {:?}", scan.wide, scan.narrow);
  scan
}

#[cfg(test)]
mod tests {
  use super::*;

  fn projection_with(height: usize, runs: &[(std::ops::Range<usize>, u32)]) -> ProjectionVector {
    let mut counts = vec![0u32; height];
    for (rows, count) in runs {
      for row in rows.clone() {
        counts[row] = *count;
      }
    }
    ProjectionVector::from(counts)
  }

  #[test]
  fn all_zero_projection_finds_nothing() {
    let scan = classify_bands(&projection_with(100, &[]), &BandConfig::default());
    assert!(!scan.is_hot());
    assert!(!scan.found());
    assert_eq!(scan, BandScan::default());
  }

  #[test]
  fn sustained_wide_run_is_hot() {
    let projection = projection_with(100, &[(40..61, 60)]);
    let scan = classify_bands(&projection, &BandConfig::default());

    assert!(scan.is_hot());
    assert!(!scan.found());
    assert_eq!(
      scan.wide,
      Some(TargetBand {
        kind: BandKind::Wide,
        start: 40,
        end: 61
      })
    );
  }

  #[test]
  fn single_row_spike_is_rejected() {
    let projection = projection_with(100, &[(50..51, 100)]);
    let scan = classify_bands(&projection, &BandConfig::default());
    assert!(!scan.is_hot());
    assert!(!scan.found());
  }

  #[test]
  fn narrow_run_end_uses_front_average() {
    let projection = projection_with(100, &[(70..80, 20)]);
    let scan = classify_bands(&projection, &BandConfig::default());

    assert!(!scan.is_hot());
    assert!(scan.found());
    // 前向均值在带尾部提前跌破阈值，结束行早于实际的 80
    assert_eq!(
      scan.narrow,
      Some(TargetBand {
        kind: BandKind::Narrow,
        start: 70,
        end: 78
      })
    );
  }

  #[test]
  fn wide_and_narrow_bands_in_one_frame() {
    let projection = projection_with(120, &[(20..35, 80), (70..85, 20)]);
    let scan = classify_bands(&projection, &BandConfig::default());

    assert!(scan.is_hot());
    assert!(scan.found());
    assert_eq!(scan.wide.map(|b| b.start), Some(20));
    assert_eq!(scan.narrow.map(|b| b.start), Some(70));
  }

  #[test]
  fn first_narrow_band_wins() {
    let projection = projection_with(150, &[(30..45, 20), (90..110, 25)]);
    let scan = classify_bands(&projection, &BandConfig::default());
    let narrow = scan.narrow.unwrap();
    assert_eq!(narrow.start, 30);
    // 后续带的行继续推进结束行
    assert!(narrow.end > 90);
  }

  #[test]
  fn rows_inside_edge_window_are_ignored() {
    let projection = projection_with(40, &[(0..5, 60), (35..40, 60)]);
    let scan = classify_bands(&projection, &BandConfig::default());
    assert!(!scan.is_hot());
  }

  #[test]
  fn short_projection_scans_nothing() {
    let projection = projection_with(10, &[(0..10, 60)]);
    assert_eq!(
      classify_bands(&projection, &BandConfig::default()),
      BandScan::default()
    );
    let empty = ProjectionVector::from(Vec::new());
    assert_eq!(
      classify_bands(&empty, &BandConfig::default()),
      BandScan::default()
    );
  }

  #[test]
  fn counts_at_threshold_are_not_candidates() {
    let projection = projection_with(100, &[(40..60, 10)]);
    let scan = classify_bands(&projection, &BandConfig::default());
    assert!(!scan.found());
  }

  #[test]
  fn wide_threshold_defaults_to_four_times_narrow() {
    let config = BandConfig::with_min_run(12);
    assert_eq!(config.wide_run_pixels, 48);
    assert_eq!(config.smoothing_window, 5);
  }

  #[test]
  fn wide_threshold_saturates_for_huge_narrow_threshold() {
    let config = BandConfig::with_min_run(1 << 30);
    assert_eq!(config.wide_run_pixels, u32::MAX);
    assert!(config.wide_run_pixels >= config.min_run_pixels);
  }

  #[test]
  fn scan_is_deterministic() {
    let projection = projection_with(200, &[(20..28, 15), (60..90, 45), (120..140, 30)]);
    let config = BandConfig::default().with_smoothing_window(3);
    let first = classify_bands(&projection, &config);
    for _ in 0..5 {
      assert_eq!(classify_bands(&projection, &config), first);
    }
  }
}
