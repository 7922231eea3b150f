// 该文件是 Retrosight （回光） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 输入
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

//! # GStreamer 视频输入模块
//!
//! 支持三类视频源：
//! - 摄像头：`gst://camera/dev/video0?width=1024&height=768&fps=30`
//! - 视频文件：`gst://file/path/to/video.mp4`
//! - 网络流：`gst://stream?uri=rtsp://10.0.0.2:8554/cam`
//!
//! 所有管道末端统一转换为 RGB 并接入 `appsink`。
//!
//! ## 系统依赖
//!
//! **Ubuntu/Debian:**
//! ```bash
//! sudo apt-get install libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev
//! ```

use std::collections::HashMap;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  input::{Acquisition, FrameSource},
};

const DEFAULT_CAMERA_WIDTH: u32 = 1024;
const DEFAULT_CAMERA_HEIGHT: u32 = 768;
const DEFAULT_CAMERA_FPS: u32 = 30;
const PULL_TIMEOUT_MS: u64 = 1000;

/// GStreamer 输入错误类型
#[derive(Error, Debug)]
pub enum GStreamerInputError {
  /// URI scheme 不匹配（期望 "gst://"）
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  /// 网络流缺少 uri 参数
  #[error("Missing stream uri")]
  MissingStreamUri,
  #[error("GStreamer error: {0}")]
  GStreamerError(#[from] gst::glib::Error),
  #[error("GStreamer boolean error: {0}")]
  GStreamerBoolError(#[from] gst::glib::BoolError),
  #[error("Failed to get appsink element")]
  AppSinkNotFound,
  #[error("Failed to convert element to appsink")]
  AppSinkConversionFailed,
  #[error("Failed to get video info from caps")]
  VideoInfoError,
  #[error("Unsupported video format")]
  UnsupportedFormat,
  #[error("Pipeline error: {0}")]
  PipelineError(String),
  #[error("Buffer size mismatch: expected {expected} bytes, got {actual} bytes")]
  BufferSizeMismatch { expected: usize, actual: usize },
  #[error("State change error: {0}")]
  StateChangeError(#[from] gst::StateChangeError),
}

pub enum GStreamerInputBuilderItem {
  FileSource(String),
  StreamSource(String),
  CameraSource {
    camera: String,
    io_mode: Option<u32>,
    format: String,
    width: u32,
    height: u32,
    fps: u32,
  },
  Scale {
    width: u32,
    height: u32,
  },
  TargetFormat {
    format: String,
  },
  VideoFlip {
    method: u32,
    direction: u32,
  },
}

impl GStreamerInputBuilderItem {
  fn to_pipeline(&self) -> String {
    match self {
      GStreamerInputBuilderItem::FileSource(path) => {
        format!("filesrc location={} ! decodebin", path)
      }
      GStreamerInputBuilderItem::StreamSource(uri) => {
        format!("uridecodebin uri={}", uri)
      }
      GStreamerInputBuilderItem::CameraSource {
        camera,
        io_mode,
        format,
        width,
        height,
        fps,
      } => {
        let io_mode_str = if let Some(mode) = io_mode {
          format!(" io-mode={}", mode)
        } else {
          "".to_string()
        };
        format!(
          "v4l2src device={}{} ! video/x-raw,format={},width={},height={},framerate={}/1",
          camera, io_mode_str, format, width, height, fps
        )
      }
      GStreamerInputBuilderItem::Scale { width, height } => {
        format!("videoscale ! video/x-raw,width={},height={}", width, height)
      }
      GStreamerInputBuilderItem::TargetFormat { format } => {
        format!("videoconvert ! video/x-raw,format={}", format)
      }
      GStreamerInputBuilderItem::VideoFlip { method, direction } => {
        format!("videoflip method={} video-direction={}", method, direction)
      }
    }
  }
}

/// GStreamer 输入管道构建器
pub struct GStreamerInputPipelineBuilder {
  items: Vec<GStreamerInputBuilderItem>,
}

impl GStreamerInputPipelineBuilder {
  fn query_u32(query: &HashMap<String, String>, key: &str) -> Option<u32> {
    query.get(key).and_then(|v| v.parse::<u32>().ok())
  }

  fn build_camera_pipeline(path: &str, query: &HashMap<String, String>) -> Self {
    let mut items = vec![GStreamerInputBuilderItem::CameraSource {
      camera: path.to_string(),
      io_mode: Self::query_u32(query, "io-mode"),
      format: query
        .get("format")
        .cloned()
        .unwrap_or_else(|| String::from("YUY2")),
      width: Self::query_u32(query, "width").unwrap_or(DEFAULT_CAMERA_WIDTH),
      height: Self::query_u32(query, "height").unwrap_or(DEFAULT_CAMERA_HEIGHT),
      fps: Self::query_u32(query, "fps").unwrap_or(DEFAULT_CAMERA_FPS),
    }];
    items.extend(Self::video_flip(query.get("rotate").map(|s| s.as_ref())));
    Self { items }
  }

  fn build_file_pipeline(path: &str, query: &HashMap<String, String>) -> Self {
    let mut items = vec![GStreamerInputBuilderItem::FileSource(path.to_string())];
    items.extend(Self::scale(query));
    items.extend(Self::video_flip(query.get("rotate").map(|s| s.as_ref())));
    Self { items }
  }

  fn build_stream_pipeline(query: &HashMap<String, String>) -> Result<Self, GStreamerInputError> {
    let uri = query
      .get("uri")
      .ok_or(GStreamerInputError::MissingStreamUri)?;
    let mut items = vec![GStreamerInputBuilderItem::StreamSource(uri.clone())];
    items.extend(Self::scale(query));
    items.extend(Self::video_flip(query.get("rotate").map(|s| s.as_ref())));
    Ok(Self { items })
  }

  fn scale(query: &HashMap<String, String>) -> Option<GStreamerInputBuilderItem> {
    let width = Self::query_u32(query, "width")?;
    let height = Self::query_u32(query, "height")?;
    Some(GStreamerInputBuilderItem::Scale { width, height })
  }

  fn video_flip(rotate: Option<&str>) -> Option<GStreamerInputBuilderItem> {
    let (method, direction) = match rotate? {
      "90" => (1, 1),
      "180" => (2, 2),
      "270" => (3, 3),
      _ => (0, 0),
    };
    Some(GStreamerInputBuilderItem::VideoFlip { method, direction })
  }

  pub fn description(&self) -> String {
    let basic_pipeline = self
      .items
      .iter()
      .map(GStreamerInputBuilderItem::to_pipeline)
      .collect::<Vec<String>>()
      .join(" ! ");
    format!(
      "{} ! appsink max-buffers=2 drop=true name=sink",
      basic_pipeline
    )
  }

  pub fn build(self) -> Result<GStreamerInput, GStreamerInputError> {
    gst::init()?;

    let full_pipeline = self.description();
    info!("GStreamer pipeline description: {}", full_pipeline);

    let pipeline = gst::parse::launch(&full_pipeline)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerInputError::PipelineError("Failed to create pipeline".to_string()))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerInputError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerInputError::AppSinkConversionFailed)?;

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerInput {
      pipeline,
      appsink,
      frame_index: 0,
    })
  }
}

impl FromUrlWithScheme for GStreamerInputPipelineBuilder {
  const SCHEME: &'static str = "gst";
}

impl FromUrl for GStreamerInputPipelineBuilder {
  type Error = GStreamerInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(GStreamerInputError::SchemeMismatch);
    }

    let query: HashMap<String, String> = url
      .query_pairs()
      .map(|(k, v)| (String::from(k), String::from(v)))
      .collect();

    let mut builder = match url.host_str() {
      Some("camera") => Self::build_camera_pipeline(url.path(), &query),
      Some("file") => Self::build_file_pipeline(url.path(), &query),
      Some("stream") => Self::build_stream_pipeline(&query)?,
      _ => {
        return Err(GStreamerInputError::SchemeMismatch);
      }
    };

    builder.items.push(GStreamerInputBuilderItem::TargetFormat {
      format: "RGB".to_string(),
    });

    Ok(builder)
  }
}

/// GStreamer 视频输入
///
/// 管理 GStreamer 管道和 appsink，拉取超时视为暂无帧。
pub struct GStreamerInput {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  frame_index: u64,
}

impl Drop for GStreamerInput {
  fn drop(&mut self) {
    if let Err(e) = self.pipeline.set_state(gst::State::Null) {
      warn!("Failed to stop GStreamer pipeline: {}", e);
    }
  }
}

impl FrameSource for GStreamerInput {
  fn next_frame(&mut self) -> Acquisition {
    let timeout = gst::ClockTime::from_mseconds(PULL_TIMEOUT_MS);
    let Some(sample) = self.appsink.try_pull_sample(timeout) else {
      if self.appsink.is_eos() {
        return Acquisition::EndOfStream;
      }
      return Acquisition::NoFrame;
    };

    match convert_sample(sample) {
      Ok(frame) => {
        let timestamp_ms = frame.timestamp_ms;
        let frame = frame.with_index(self.frame_index, timestamp_ms);
        self.frame_index += 1;
        Acquisition::Frame(frame)
      }
      Err(e) => {
        error!("Failed to fetch sample: {}", e);
        Acquisition::NoFrame
      }
    }
  }
}

fn convert_sample(sample: gst::Sample) -> Result<Frame, GStreamerInputError> {
  let buffer = sample
    .buffer()
    .ok_or_else(|| GStreamerInputError::PipelineError("No buffer in sample".to_string()))?;
  let caps = sample
    .caps()
    .ok_or_else(|| GStreamerInputError::PipelineError("No caps in sample".to_string()))?;

  let video_info =
    gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerInputError::VideoInfoError)?;

  let width = video_info.width() as usize;
  let height = video_info.height() as usize;
  let stride = video_info.stride()[0] as usize;

  let map = buffer.map_readable().map_err(|e| {
    GStreamerInputError::PipelineError(format!("Failed to map buffer for reading: {}", e))
  })?;
  let data = map.as_slice();

  let expected_size = stride * height.saturating_sub(1) + width * 3;
  if data.len() < expected_size {
    return Err(GStreamerInputError::BufferSizeMismatch {
      expected: expected_size,
      actual: data.len(),
    });
  }

  // 去除行尾填充，BGR 交换为 RGB
  let mut rgb = Vec::with_capacity(width * height * 3);
  match video_info.format() {
    gst_video::VideoFormat::Rgb => {
      for h in 0..height {
        rgb.extend_from_slice(&data[h * stride..h * stride + width * 3]);
      }
    }
    gst_video::VideoFormat::Bgr => {
      for h in 0..height {
        for pixel in data[h * stride..h * stride + width * 3].chunks_exact(3) {
          rgb.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
        }
      }
    }
    _ => return Err(GStreamerInputError::UnsupportedFormat),
  }

  let timestamp_ms = buffer.pts().map(|pts| pts.mseconds()).unwrap_or(0);
  Frame::from_raw(width as u32, height as u32, rgb)
    .map(|frame| frame.with_index(0, timestamp_ms))
    .ok_or(GStreamerInputError::BufferSizeMismatch {
      expected: width * height * 3,
      actual: data.len(),
    })
}
