// 该文件是 Retrosight （回光） 项目的一部分。
// src/output/udp_telemetry.rs - UDP 遥测通道
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

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, output::TelemetryChannel};

#[derive(Error, Debug)]
pub enum TelemetryError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("缺少遥测目标地址或端口: {0}")]
  MissingAddress(String),
  #[error("无法解析遥测目标地址 {0}")]
  Unresolved(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("数据包未完整发送: {sent}/{expected} 字节")]
  Truncated { sent: usize, expected: usize },
}

/// UDP 遥测通道，`udp://10.36.37.2:1130`
///
/// 启动时解析一次目标地址并绑定本地临时端口，之后只负责发送。
#[derive(Debug)]
pub struct UdpTelemetry {
  socket: UdpSocket,
  target: SocketAddr,
}

impl FromUrlWithScheme for UdpTelemetry {
  const SCHEME: &'static str = "udp";
}

impl FromUrl for UdpTelemetry {
  type Error = TelemetryError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(TelemetryError::SchemeMismatch(url.scheme().to_string()));
    }

    let (Some(host), Some(port)) = (url.host_str(), url.port()) else {
      return Err(TelemetryError::MissingAddress(url.to_string()));
    };
    let host = host.trim_start_matches('[').trim_end_matches(']');

    Self::connect((host, port))
  }
}

impl UdpTelemetry {
  pub fn connect(target: impl ToSocketAddrs + std::fmt::Debug) -> Result<Self, TelemetryError> {
    let description = format!("{:?}", target);
    let target = target
      .to_socket_addrs()?
      .next()
      .ok_or(TelemetryError::Unresolved(description))?;

    let local: SocketAddr = if target.is_ipv4() {
      (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
      (Ipv6Addr::UNSPECIFIED, 0).into()
    };
    let socket = UdpSocket::bind(local)?;
    info!("遥测通道: {} -> {}", socket.local_addr()?, target);

    Ok(Self { socket, target })
  }

  pub fn target(&self) -> SocketAddr {
    self.target
  }
}

impl TelemetryChannel for UdpTelemetry {
  type Error = TelemetryError;

  fn send(&self, packet: &[u8]) -> Result<(), Self::Error> {
    let sent = self.socket.send_to(packet, self.target)?;
    if sent != packet.len() {
      return Err(TelemetryError::Truncated {
        sent,
        expected: packet.len(),
      });
    }
    Ok(())
  }
}
