// 该文件是 Retrosight （回光） 项目的一部分。
// src/output.rs - 输出定义
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
use tracing::warn;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, detect::DetectionResult, frame::Frame};

pub trait Render<Frame, Output>: Sized {
  type Error;
  fn render_result(&self, frame: &Frame, result: &Output) -> Result<(), Self::Error>;
}

pub mod draw;

mod telemetry;
pub use self::telemetry::{
  PACKET_SIZE, RANGE_INVALID, TelemetryChannel, TelemetryPacket, TelemetryPublisher,
};

mod udp_telemetry;
pub use self::udp_telemetry::{TelemetryError, UdpTelemetry};

#[cfg(feature = "save_image_file")]
mod save_image_file;
#[cfg(feature = "save_image_file")]
pub use self::save_image_file::{SaveImageFileError, SaveImageFileOutput};

#[cfg(feature = "directory_record")]
mod directory_record;
#[cfg(feature = "directory_record")]
pub use self::directory_record::{DirectoryRecordOutput, DirectoryRecordOutputError};

#[derive(Error, Debug)]
pub enum OutputError {
  #[error("遥测发送错误: {0}")]
  TelemetryError(#[from] TelemetryError),
  #[cfg(feature = "save_image_file")]
  #[error("保存图像文件错误: {0}")]
  SaveImageFileError(#[from] SaveImageFileError),
  #[cfg(feature = "directory_record")]
  #[error("目录记录输出错误: {0}")]
  DirectoryRecordOutputError(#[from] DirectoryRecordOutputError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

pub enum OutputWrapper {
  Telemetry(TelemetryPublisher<UdpTelemetry>),
  #[cfg(feature = "save_image_file")]
  SaveImageFileOutput(SaveImageFileOutput),
  #[cfg(feature = "directory_record")]
  DirectoryRecordOutput(DirectoryRecordOutput),
}

impl FromUrl for OutputWrapper {
  type Error = OutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      UdpTelemetry::SCHEME => {
        let channel = UdpTelemetry::from_url(url)?;
        Ok(OutputWrapper::Telemetry(TelemetryPublisher::new(channel)))
      }
      #[cfg(feature = "save_image_file")]
      SaveImageFileOutput::SCHEME => {
        let output = SaveImageFileOutput::from_url(url)?;
        Ok(OutputWrapper::SaveImageFileOutput(output))
      }
      #[cfg(feature = "directory_record")]
      DirectoryRecordOutput::SCHEME => {
        let output = DirectoryRecordOutput::from_url(url)?;
        Ok(OutputWrapper::DirectoryRecordOutput(output))
      }
      scheme => Err(OutputError::SchemeMismatch(scheme.to_string())),
    }
  }
}

impl Render<Frame, DetectionResult> for OutputWrapper {
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    match self {
      OutputWrapper::Telemetry(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "save_image_file")]
      OutputWrapper::SaveImageFileOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
      #[cfg(feature = "directory_record")]
      OutputWrapper::DirectoryRecordOutput(output) => output
        .render_result(frame, result)
        .map_err(OutputError::from),
    }
  }
}

/// 多个输出依次渲染
///
/// 某个输出失败不影响其余输出，返回第一个错误。
pub struct Outputs {
  outputs: Vec<OutputWrapper>,
}

impl Outputs {
  pub fn from_urls<'a>(urls: impl IntoIterator<Item = &'a Url>) -> Result<Self, OutputError> {
    let outputs = urls
      .into_iter()
      .map(OutputWrapper::from_url)
      .collect::<Result<Vec<_>, _>>()?;
    Ok(Self { outputs })
  }

  pub fn len(&self) -> usize {
    self.outputs.len()
  }

  pub fn is_empty(&self) -> bool {
    self.outputs.is_empty()
  }
}

impl From<Vec<OutputWrapper>> for Outputs {
  fn from(outputs: Vec<OutputWrapper>) -> Self {
    Self { outputs }
  }
}

impl Render<Frame, DetectionResult> for Outputs {
  type Error = OutputError;

  fn render_result(&self, frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    let mut first_error = None;
    for output in &self.outputs {
      if let Err(e) = output.render_result(frame, result) {
        warn!("输出失败: {}", e);
        first_error.get_or_insert(e);
      }
    }
    first_error.map_or(Ok(()), Err)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn unknown_output_scheme_is_rejected() {
    let url = Url::parse("rtsp://127.0.0.1:8554/out").unwrap();
    assert!(matches!(
      OutputWrapper::from_url(&url),
      Err(OutputError::SchemeMismatch(scheme)) if scheme == "rtsp"
    ));
  }

  #[test]
  fn builds_udp_output_from_url() {
    let url = Url::parse("udp://127.0.0.1:1130").unwrap();
    let outputs = Outputs::from_urls([&url]).unwrap();
    assert_eq!(outputs.len(), 1);
  }
}
