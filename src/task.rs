// 该文件是 Retrosight （回光） 项目的一部分。
// src/task.rs - 采集、检测、发布任务循环
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

use std::{
  sync::mpsc::{self, Receiver, RecvTimeoutError},
  thread,
  time::{Duration, Instant},
};

use tracing::{error, info, warn};

use crate::{
  detect::{DetectionResult, Detector},
  frame::Frame,
  input::{Acquisition, FrameSource},
  output::Render,
};

const DEFAULT_STALL_BACKOFF: Duration = Duration::from_secs(1);
const FPS_REPORT_INTERVAL: u64 = 30;
const STALL_REPORT_INTERVAL: u64 = 10;
const FORCE_EXIT_GRACE: Duration = Duration::from_secs(30);

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 注册 Ctrl-C 处理函数，返回停止信号
///
/// 收到信号后若 30 秒内仍未退出则强制结束进程。
pub fn install_ctrlc_handler() -> anyhow::Result<Receiver<()>> {
  let (tx, rx) = mpsc::channel();

  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    thread::spawn(|| {
      thread::sleep(FORCE_EXIT_GRACE);
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })?;

  Ok(rx)
}

/// 处理单帧：静态图片的手动模式
pub struct OneShotTask;

impl<I, M, O> Task<I, M, O> for OneShotTask
where
  I: FrameSource,
  M: Detector<Input = Frame, Output = DetectionResult>,
  M::Error: std::error::Error + Send + Sync + 'static,
  O: Render<Frame, DetectionResult>,
  O::Error: std::error::Error + Send + Sync + 'static,
{
  type Output = DetectionResult;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = match input.next_frame() {
      Acquisition::Frame(frame) => frame,
      Acquisition::NoFrame | Acquisition::EndOfStream => anyhow::bail!("没有输入帧"),
    };
    info!("图像: {}x{}", frame.width(), frame.height());

    let now = Instant::now();
    let result = model.detect(&frame)?;
    info!("检测完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;

    Ok(result)
  }
}

/// 连续任务的运行统计
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  /// 取到的帧数
  pub frames: u64,
  /// 检测失败被跳过的帧数
  pub dropped: u64,
  /// 发布失败次数
  pub failed_outputs: u64,
  /// 无帧可用的次数
  pub stalls: u64,
}

/// 连续取帧处理，直到输入耗尽、达到帧数上限或收到停止信号
#[derive(Debug)]
pub struct ContinuousTask {
  frame_number: Option<u64>,
  stall_backoff: Duration,
  stop: Option<Receiver<()>>,
}

impl Default for ContinuousTask {
  fn default() -> Self {
    Self {
      frame_number: None,
      stall_backoff: DEFAULT_STALL_BACKOFF,
      stop: None,
    }
  }
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<u64>) -> Self {
    self.frame_number = frame_number;
    self
  }

  pub fn with_stall_backoff(mut self, stall_backoff: Duration) -> Self {
    self.stall_backoff = stall_backoff;
    self
  }

  pub fn with_stop_signal(mut self, stop: Receiver<()>) -> Self {
    self.stop = Some(stop);
    self
  }

  fn stop_requested(&self) -> bool {
    match &self.stop {
      Some(rx) => matches!(rx.try_recv(), Ok(())),
      None => false,
    }
  }

  // 等待退避时间，期间收到停止信号则返回 true
  fn back_off(&self) -> bool {
    match &self.stop {
      Some(rx) => match rx.recv_timeout(self.stall_backoff) {
        Ok(()) => true,
        Err(RecvTimeoutError::Timeout) => false,
        Err(RecvTimeoutError::Disconnected) => {
          thread::sleep(self.stall_backoff);
          false
        }
      },
      None => {
        thread::sleep(self.stall_backoff);
        false
      }
    }
  }
}

impl<I, M, O> Task<I, M, O> for ContinuousTask
where
  I: FrameSource,
  M: Detector<Input = Frame, Output = DetectionResult>,
  M::Error: std::fmt::Display,
  O: Render<Frame, DetectionResult>,
  O::Error: std::fmt::Display,
{
  type Output = TaskSummary;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let mut summary = TaskSummary::default();
    let mut consecutive_stalls = 0u64;
    let mut window_start = Instant::now();

    loop {
      if self.stop_requested() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      let frame = match input.next_frame() {
        Acquisition::Frame(frame) => frame,
        Acquisition::NoFrame => {
          summary.stalls += 1;
          consecutive_stalls += 1;
          if consecutive_stalls == 1 || consecutive_stalls % STALL_REPORT_INTERVAL == 0 {
            warn!("没有可用帧 (连续 {} 次)，稍后重试", consecutive_stalls);
          }
          if self.back_off() {
            warn!("中断信号接收，退出任务循环");
            break;
          }
          continue;
        }
        Acquisition::EndOfStream => {
          info!("输入结束");
          break;
        }
      };
      consecutive_stalls = 0;
      summary.frames += 1;

      match model.detect(&frame) {
        Ok(result) => {
          if let Err(e) = output.render_result(&frame, &result) {
            summary.failed_outputs += 1;
            warn!("第 {} 帧结果发布失败: {}", frame.index, e);
          }
        }
        Err(e) => {
          summary.dropped += 1;
          error!("第 {} 帧处理失败，已跳过: {}", frame.index, e);
        }
      }

      if summary.frames % FPS_REPORT_INTERVAL == 0 {
        let elapsed = window_start.elapsed().as_secs_f64();
        if elapsed > 0.0 {
          info!("处理帧率: {:.2} 帧/秒", FPS_REPORT_INTERVAL as f64 / elapsed);
        }
        window_start = Instant::now();
      }

      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break;
      }
    }

    info!("任务完成，退出: {:?}", summary);
    Ok(summary)
  }
}
