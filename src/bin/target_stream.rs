// 该文件是 Retrosight （回光） 项目的一部分。
// src/bin/target_stream.rs - 连续视频流检测
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

use anyhow::Result;
use clap::Parser;
use url::Url;

use retrosight::{
  FromUrl,
  args::{DetectorArgs, LoopArgs, OutputArgs},
  detect::TargetDetector,
  input::InputWrapper,
  output::Outputs,
  task::{ContinuousTask, Task, install_ctrlc_handler},
};
use tracing::info;

/// 持续采集视频帧，逐帧检测并发送遥测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，如 v4l:///dev/video0 或 gst://camera
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  #[command(flatten)]
  pub output: OutputArgs,

  #[command(flatten)]
  pub detector: DetectorArgs,

  #[command(flatten)]
  pub looping: LoopArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("遥测地址: {}", args.output.telemetry);

  let stop = install_ctrlc_handler()?;

  let input = InputWrapper::from_url(&args.input)?;
  let outputs = Outputs::from_urls(args.output.urls())?;
  info!("输出数量: {}", outputs.len());
  let detector = TargetDetector::new(args.detector.into_config()?);

  let summary = ContinuousTask::default()
    .with_frame_number(args.looping.frame_number)
    .with_stall_backoff(args.looping.stall_backoff())
    .with_stop_signal(stop)
    .run_task(input, detector, outputs)?;

  info!(
    "共处理 {} 帧，跳过 {} 帧，发布失败 {} 次",
    summary.frames, summary.dropped, summary.failed_outputs
  );

  Ok(())
}
