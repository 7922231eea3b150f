// 该文件是 Retrosight （回光） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{Datelike, Utc};
use serde_json::json;
use thiserror::Error;

use crate::{
  FromUrl, FromUrlWithScheme,
  detect::{DetectionResult, TargetBand},
  frame::Frame,
  output::{Render, draw::Draw},
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 按日期分目录保存标注帧与检测记录
///
/// `folder:///var/log/retrosight` 只记录找到目标的帧，加 `?always` 记录所有帧。
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Draw,
  frame_counter: Mutex<u16>,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput {
      directory: PathBuf::from(uri.path()),
      draw: Draw::default(),
      frame_counter: Mutex::new(0),
      always,
    })
  }
}

fn band_json(band: &Option<TargetBand>) -> serde_json::Value {
  match band {
    Some(band) => json!({ "start": band.start, "end": band.end }),
    None => serde_json::Value::Null,
  }
}

impl DirectoryRecordOutput {
  fn frame_id(&self) -> u16 {
    let mut counter = self
      .frame_counter
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    *counter = counter.wrapping_add(1);
    *counter
  }

  fn frame_path(&self) -> Result<PathBuf, DirectoryRecordOutputError> {
    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }

  fn record(
    &self,
    path: &Path,
    frame: &Frame,
    result: &DetectionResult,
  ) -> Result<(), DirectoryRecordOutputError> {
    let record = json!({
      "frame": frame.index,
      "timestamp_ms": frame.timestamp_ms,
      "is_hot": result.is_hot,
      "range": result.range,
      "wide": band_json(&result.wide),
      "narrow": band_json(&result.narrow),
    });
    std::fs::write(
      path.with_extension("json"),
      serde_json::to_vec_pretty(&record)?,
    )?;
    Ok(())
  }
}

impl Render<Frame, DetectionResult> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    if !self.always && !result.is_hot && !result.found() {
      return Ok(());
    }

    let path = self.frame_path()?;
    self.draw.draw_detection(frame, result).save(&path)?;
    self.record(&path, frame, result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detect::BandKind;
  use image::RgbImage;

  fn files_with_extension(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
      for entry in std::fs::read_dir(dir).unwrap() {
        let path = entry.unwrap().path();
        if path.is_dir() {
          pending.push(path);
        } else if path.extension().is_some_and(|e| e == extension) {
          found.push(path);
        }
      }
    }
    found
  }

  #[test]
  fn records_hot_frames_only_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = Frame::from(RgbImage::new(16, 16)).with_index(3, 100);

    output
      .render_result(&frame, &DetectionResult::not_found())
      .unwrap();
    assert!(files_with_extension(dir.path(), "png").is_empty());

    let hot = DetectionResult {
      is_hot: true,
      range: Some(120.5),
      wide: Some(TargetBand {
        kind: BandKind::Wide,
        start: 4,
        end: 8,
      }),
      narrow: None,
    };
    output.render_result(&frame, &hot).unwrap();

    assert_eq!(files_with_extension(dir.path(), "png").len(), 1);
    let records = files_with_extension(dir.path(), "json");
    assert_eq!(records.len(), 1);
    let record: serde_json::Value =
      serde_json::from_slice(&std::fs::read(&records[0]).unwrap()).unwrap();
    assert_eq!(record["frame"], 3);
    assert_eq!(record["is_hot"], true);
    assert_eq!(record["range"], 120.5);
    assert_eq!(record["wide"]["start"], 4);
    assert!(record["narrow"].is_null());
  }

  #[test]
  fn always_records_every_frame() {
    let dir = tempfile::tempdir().unwrap();
    let url = url::Url::parse(&format!("folder://{}?always", dir.path().display())).unwrap();
    let output = DirectoryRecordOutput::from_url(&url).unwrap();
    let frame = Frame::from(RgbImage::new(4, 4));

    output
      .render_result(&frame, &DetectionResult::not_found())
      .unwrap();
    output
      .render_result(&frame, &DetectionResult::not_found())
      .unwrap();
    assert_eq!(files_with_extension(dir.path(), "json").len(), 2);
  }
}
