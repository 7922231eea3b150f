// 该文件是 Retrosight （回光） 项目的一部分。
// src/bin/target_oneshot.rs - 单张图片检测
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
  args::{DetectorArgs, OutputArgs},
  detect::TargetDetector,
  input::InputWrapper,
  output::Outputs,
  task::{OneShotTask, Task},
};
use tracing::info;

/// 对一帧图像做目标检测并发送一次遥测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源，如 image:///tmp/target.png
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  #[command(flatten)]
  pub output: OutputArgs,

  #[command(flatten)]
  pub detector: DetectorArgs,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("输入来源: {}", args.input);
  info!("遥测地址: {}", args.output.telemetry);
  for record in &args.output.records {
    info!("记录输出: {}", record);
  }

  let input = InputWrapper::from_url(&args.input)?;
  let outputs = Outputs::from_urls(args.output.urls())?;
  let detector = TargetDetector::new(args.detector.into_config()?);

  let result = OneShotTask.run_task(input, detector, outputs)?;
  info!(
    "检测结果: 命中={}, 宽带={:?}, 窄带={:?}, 距离={:?}",
    result.is_hot, result.wide, result.narrow, result.range
  );

  Ok(())
}
