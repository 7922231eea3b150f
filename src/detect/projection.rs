// 该文件是 Retrosight （回光） 项目的一部分。
// src/detect/projection.rs - 掩码行投影
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

use std::ops::Range;

use crate::detect::Mask;

/// 每行命中像素个数，长度等于掩码高度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionVector {
  counts: Box<[u32]>,
}

impl From<&Mask> for ProjectionVector {
  fn from(mask: &Mask) -> Self {
    let counts = mask
      .rows()
      .map(|row| row.filter(|p| p[0] != 0).count() as u32)
      .collect();
    Self { counts }
  }
}

impl From<Vec<u32>> for ProjectionVector {
  fn from(counts: Vec<u32>) -> Self {
    Self {
      counts: counts.into_boxed_slice(),
    }
  }
}

impl ProjectionVector {
  pub fn len(&self) -> usize {
    self.counts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.counts.is_empty()
  }

  pub fn get(&self, row: usize) -> Option<u32> {
    self.counts.get(row).copied()
  }

  pub fn as_slice(&self) -> &[u32] {
    &self.counts
  }

  /// 区间内各行的平均值，区间越界或为空时返回 `None`
  pub fn mean(&self, rows: Range<usize>) -> Option<f64> {
    let window = self.counts.get(rows)?;
    if window.is_empty() {
      return None;
    }
    let sum: u64 = window.iter().map(|&c| c as u64).sum();
    Some(sum as f64 / window.len() as f64)
  }
}
