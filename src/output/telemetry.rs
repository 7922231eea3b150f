// 该文件是 Retrosight （回光） 项目的一部分。
// src/output/telemetry.rs - 遥测数据包与发布
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

use std::fmt;

use tracing::debug;

use crate::{detect::DetectionResult, frame::Frame, output::Render};

/// 数据包固定长度，不足部分以 NUL 填充
pub const PACKET_SIZE: usize = 256;
/// 无有效距离时的 `DIST` 值
pub const RANGE_INVALID: i64 = -1;

/// `HOT=<true|false> DIST=<整数>` 格式的 ASCII 数据包
#[derive(Clone, PartialEq, Eq)]
pub struct TelemetryPacket {
  buffer: [u8; PACKET_SIZE],
  len: usize,
}

impl TelemetryPacket {
  /// 距离向零截断为整数，`None` 写作 -1
  pub fn new(is_hot: bool, range: Option<f64>) -> Self {
    let distance = range
      .filter(|r| r.is_finite())
      .map(|r| r.trunc() as i64)
      .unwrap_or(RANGE_INVALID);
    let text = format!("HOT={} DIST={}", is_hot, distance);

    let mut buffer = [0u8; PACKET_SIZE];
    let len = text.len().min(PACKET_SIZE);
    buffer[..len].copy_from_slice(&text.as_bytes()[..len]);
    Self { buffer, len }
  }

  pub fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
    &self.buffer
  }

  /// 去掉 NUL 填充后的文本
  pub fn text(&self) -> &str {
    std::str::from_utf8(&self.buffer[..self.len]).unwrap_or_default()
  }
}

impl From<&DetectionResult> for TelemetryPacket {
  fn from(result: &DetectionResult) -> Self {
    Self::new(result.is_hot, result.range)
  }
}

impl fmt::Display for TelemetryPacket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.text())
  }
}

impl fmt::Debug for TelemetryPacket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("TelemetryPacket").field(&self.text()).finish()
  }
}

/// 遥测传输通道，只负责尽力发送一次
pub trait TelemetryChannel {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(&self, packet: &[u8]) -> Result<(), Self::Error>;
}

impl<C: TelemetryChannel + ?Sized> TelemetryChannel for &C {
  type Error = C::Error;

  fn send(&self, packet: &[u8]) -> Result<(), Self::Error> {
    (**self).send(packet)
  }
}

/// 每帧发布一个遥测包，失败不重试，下一帧的数据包会取代它
pub struct TelemetryPublisher<C> {
  channel: C,
}

impl<C: TelemetryChannel> TelemetryPublisher<C> {
  pub fn new(channel: C) -> Self {
    Self { channel }
  }

  pub fn channel(&self) -> &C {
    &self.channel
  }

  pub fn publish(&self, result: &DetectionResult) -> Result<(), C::Error> {
    let packet = TelemetryPacket::from(result);
    debug!("发送数据: {}", packet);
    self.channel.send(packet.as_bytes())
  }
}

impl<C: TelemetryChannel> Render<Frame, DetectionResult> for TelemetryPublisher<C> {
  type Error = C::Error;

  fn render_result(&self, _frame: &Frame, result: &DetectionResult) -> Result<(), Self::Error> {
    self.publish(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  #[derive(Default)]
  struct RecordingChannel {
    sent: RefCell<Vec<Vec<u8>>>,
  }

  impl TelemetryChannel for RecordingChannel {
    type Error = std::io::Error;

    fn send(&self, packet: &[u8]) -> Result<(), Self::Error> {
      self.sent.borrow_mut().push(packet.to_vec());
      Ok(())
    }
  }

  struct BrokenChannel;

  impl TelemetryChannel for BrokenChannel {
    type Error = std::io::Error;

    fn send(&self, _packet: &[u8]) -> Result<(), Self::Error> {
      Err(std::io::Error::other("network unreachable"))
    }
  }

  #[test]
  fn hot_with_range_packet() {
    let packet = TelemetryPacket::new(true, Some(42.0));
    assert!(packet.text().contains("HOT=true"));
    assert!(packet.text().contains("DIST=42"));
    assert_eq!(packet.text(), "HOT=true DIST=42");
  }

  #[test]
  fn invalid_range_uses_sentinel_and_nul_padding() {
    let packet = TelemetryPacket::new(true, None);
    assert_eq!(packet.text(), "HOT=true DIST=-1");

    let bytes = packet.as_bytes();
    assert_eq!(bytes.len(), PACKET_SIZE);
    assert_eq!(&bytes[..16], b"HOT=true DIST=-1");
    assert!(bytes[16..].iter().all(|&b| b == 0));
  }

  #[test]
  fn range_is_truncated_toward_zero() {
    assert_eq!(TelemetryPacket::new(false, Some(345.94)).text(), "HOT=false DIST=345");
    assert_eq!(TelemetryPacket::new(false, Some(-12.7)).text(), "HOT=false DIST=-12");
    assert_eq!(TelemetryPacket::new(false, Some(f64::NAN)).text(), "HOT=false DIST=-1");
  }

  #[test]
  fn publisher_sends_full_buffer() {
    let publisher = TelemetryPublisher::new(RecordingChannel::default());
    let mut result = DetectionResult::not_found();
    result.is_hot = true;
    publisher.publish(&result).unwrap();

    let sent = publisher.channel().sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].len(), PACKET_SIZE);
    assert!(sent[0].starts_with(b"HOT=true DIST=-1\0"));
  }

  #[test]
  fn send_failure_is_reported() {
    let publisher = TelemetryPublisher::new(BrokenChannel);
    assert!(publisher.publish(&DetectionResult::not_found()).is_err());
  }
}
