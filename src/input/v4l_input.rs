// 该文件是 Retrosight （回光） 项目的一部分。
// src/input/v4l_input.rs - V4L2 摄像头输入
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

use std::{io::ErrorKind, time::Instant};

use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;
use v4l::{
  FourCC, buffer::Type, io::mmap::Stream, io::traits::CaptureStream, prelude::*,
  video::Capture,
};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  input::{Acquisition, FrameSource},
};

const DEFAULT_DEVICE: &str = "/dev/video0";
const DEFAULT_WIDTH: u32 = 1024;
const DEFAULT_HEIGHT: u32 = 768;
const BUFFER_COUNT: u32 = 4;
const CAPTURE_TIMEOUT_MS: u64 = 1000;

#[derive(Error, Debug)]
pub enum V4lInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Unsupported pixel format: {0}")]
  UnsupportedPixelFormat(String),
}

/// V4L2 摄像头输入
///
/// `v4l:///dev/video0?width=1024&height=768`，以 YUYV 采集并转换为 RGB。
pub struct V4lInput {
  stream: Stream<'static>,
  // stream 先于 device 释放
  _device: Device,
  width: u32,
  height: u32,
  frame_index: u64,
  start_time: Instant,
}

impl FromUrlWithScheme for V4lInput {
  const SCHEME: &'static str = "v4l";
}

impl FromUrl for V4lInput {
  type Error = V4lInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(V4lInputError::SchemaMismatch);
    }

    let device_path = if url.path().is_empty() || url.path() == "/" {
      DEFAULT_DEVICE.to_string()
    } else {
      url.path().to_string()
    };
    let query = |key: &str| {
      url
        .query_pairs()
        .find(|(k, _)| k == key)
        .and_then(|(_, v)| v.parse::<u32>().ok())
    };
    let width = query("width").unwrap_or(DEFAULT_WIDTH);
    let height = query("height").unwrap_or(DEFAULT_HEIGHT);

    Self::open(&device_path, width, height)
  }
}

impl V4lInput {
  pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, V4lInputError> {
    let device = Device::with_path(device_path)?;

    let mut format = device.format()?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;
    if format.fourcc != FourCC::new(b"YUYV") {
      return Err(V4lInputError::UnsupportedPixelFormat(format.fourcc.to_string()));
    }
    if format.width != width || format.height != height {
      warn!(
        "摄像头不支持 {}x{}, 实际分辨率 {}x{}",
        width, height, format.width, format.height
      );
    }

    let mut stream = Stream::with_buffers(&device, Type::VideoCapture, BUFFER_COUNT)?;
    stream.set_timeout(std::time::Duration::from_millis(CAPTURE_TIMEOUT_MS));
    info!(
      "已打开摄像头 {}: {}x{}",
      device_path, format.width, format.height
    );

    Ok(Self {
      stream,
      _device: device,
      width: format.width,
      height: format.height,
      frame_index: 0,
      start_time: Instant::now(),
    })
  }
}

/// 将 YUYV 格式转换为 RGB
fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
  let mut rgb = Vec::with_capacity((width * height * 3) as usize);

  for chunk in yuyv.chunks_exact(4) {
    let y0 = chunk[0] as f32;
    let u = chunk[1] as f32 - 128.0;
    let y1 = chunk[2] as f32;
    let v = chunk[3] as f32 - 128.0;

    for y in [y0, y1] {
      let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }
  }

  rgb
}

// 驱动可能按页对齐填充缓冲区，只取有效字节
fn frame_from_buffer(buffer: &[u8], bytes_used: u32, width: u32, height: u32) -> Option<Frame> {
  let used = (bytes_used as usize).min(buffer.len());
  Frame::from_raw(width, height, yuyv_to_rgb(&buffer[..used], width, height))
}

impl FrameSource for V4lInput {
  fn next_frame(&mut self) -> Acquisition {
    match self.stream.next() {
      Ok((buffer, meta)) => {
        let Some(frame) = frame_from_buffer(buffer, meta.bytesused, self.width, self.height) else {
          error!("采集缓冲区大小与 {}x{} 不符", self.width, self.height);
          return Acquisition::NoFrame;
        };

        let timestamp_ms = self.start_time.elapsed().as_millis() as u64;
        let frame = frame.with_index(self.frame_index, timestamp_ms);
        self.frame_index += 1;
        Acquisition::Frame(frame)
      }
      Err(e) if e.kind() == ErrorKind::TimedOut => Acquisition::NoFrame,
      Err(e) => {
        warn!("无法捕获帧: {}", e);
        Acquisition::NoFrame
      }
    }
  }
}
