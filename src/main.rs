// 该文件是 Qianli （千里眼） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use qianli::{
  FromUrl,
  config::PipelineConfig,
  model::{Engine, ModelError},
  record::DetectionRecorder,
  scheduler::Scheduler,
  source::{FrameSource, SourceWrapper},
  store::DetectionStore,
  tensor::Tensor,
};

/// 演示引擎
///
/// 输出固定形状的稠密网格张量，其中一个目标框沿确定性路径
/// 移动。用于在没有真实推理后端的环境里驱动整条流水线。
struct DemoEngine {
  shape: Vec<usize>,
  input_width: f32,
  input_height: f32,
  step: u64,
}

const DEMO_ROWS: usize = 16;
const DEMO_ATTRS: usize = 6;

impl DemoEngine {
  fn new(config: &PipelineConfig) -> Self {
    Self {
      shape: vec![1, DEMO_ROWS, DEMO_ATTRS],
      input_width: config.model_input_width as f32,
      input_height: config.model_input_height as f32,
      step: 0,
    }
  }
}

impl Engine for DemoEngine {
  type Error = std::convert::Infallible;

  fn output_shape(&self) -> &[usize] {
    &self.shape
  }

  fn execute(&mut self, _input: &Tensor) -> Result<Tensor, Self::Error> {
    self.step += 1;
    let mut data = vec![0.0f32; DEMO_ROWS * DEMO_ATTRS];

    let size = self.input_width.min(self.input_height) / 8.0;
    let cx = size + (self.step * 11 % 97) as f32 / 97.0 * (self.input_width - 2.0 * size);
    let cy = size + (self.step * 7 % 89) as f32 / 89.0 * (self.input_height - 2.0 * size);
    data[0] = cx;
    data[1] = cy;
    data[2] = size;
    data[3] = size;
    data[4] = 0.9;
    data[5] = 0.95;

    Ok(Tensor::new(self.shape.clone(), data).expect("固定形状的演示输出"))
  }
}

/// 模型/标签装载
///
/// 只有 demo 方案由内置引擎满足；其它方案视为装载失败，
/// 由调用方降级到推理停用模式。
fn load_engine(url: &url::Url, config: &PipelineConfig) -> Result<(DemoEngine, Vec<String>), ModelError> {
  if url.scheme() != "demo" {
    return Err(ModelError::Load(format!(
      "不支持的模型方案: {}",
      url.scheme()
    )));
  }
  Ok((DemoEngine::new(config), vec!["target".to_string()]))
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  println!("Qianli 目标检测流水线");
  println!("====================");
  println!("输入源: {}", args.source);
  println!("模型: {}", args.model);
  println!("模型输入: {}x{}", args.input_width, args.input_height);
  println!("置信度阈值: {}", args.confidence);
  println!("推理间隔: 每 {} 周期一次", args.interval);
  println!();

  let config = PipelineConfig {
    model_input_width: args.input_width,
    model_input_height: args.input_height,
    confidence_threshold: args.confidence,
    inference_interval: args.interval,
  };

  let mut source = SourceWrapper::from_url(&args.source)?;
  source.start()?;

  let store = Arc::new(DetectionStore::new());
  let recorder = args
    .record
    .as_ref()
    .map(DetectionRecorder::from_url)
    .transpose()?;

  match load_engine(&args.model, &config) {
    Ok((engine, labels)) => {
      let mut scheduler =
        Scheduler::with_engine(config, source, Arc::clone(&store), engine, labels)?;
      run_loop(&mut scheduler, &store, recorder, args.tick_hz, args.max_ticks)
    }
    Err(e) => {
      // 启动期错误只报告一次，流水线降级运行而不是退出
      error!("模型装载失败，进入推理停用模式: {}", e);
      let mut scheduler = Scheduler::disabled(config, source, Arc::clone(&store))?;
      run_loop(&mut scheduler, &store, recorder, args.tick_hz, args.max_ticks)
    }
  }
}

/// 调度循环
///
/// 以固定节奏驱动 `on_tick()`；记录器按可视化协作方的方式
/// 每个循环拉取一次快照。
fn run_loop<S: FrameSource, E: Engine>(
  scheduler: &mut Scheduler<S, E>,
  store: &DetectionStore,
  mut recorder: Option<DetectionRecorder>,
  tick_hz: f64,
  max_ticks: u64,
) -> Result<()> {
  let (tx, rx) = std::sync::mpsc::channel();

  ctrlc::set_handler(move || {
    info!("收到中断信号，准备退出...");
    let _ = tx.send(());
    std::thread::spawn(|| {
      sleep(Duration::from_secs(30));
      warn!("强制退出程序");
      std::process::exit(1);
    });
  })
  .expect("Error setting Ctrl-C handler");

  let period = Duration::from_secs_f64(1.0 / tick_hz.max(1.0));
  let mut last_seen_seq = 0u64;

  info!("开始调度循环...");
  loop {
    scheduler.on_tick();

    let snapshot = store.snapshot();
    if snapshot.frame_seq != last_seen_seq {
      last_seen_seq = snapshot.frame_seq;
      info!("帧 {}: {} 个检测结果", snapshot.frame_seq, snapshot.len());
      for det in snapshot.detections.iter() {
        info!(
          "  - {}: {:.2}% at ({:.3}, {:.3}, {:.3}x{:.3})",
          if det.label.is_empty() { "?" } else { &det.label },
          det.confidence * 100.0,
          det.x,
          det.y,
          det.width,
          det.height
        );
      }
    }
    if let Some(rec) = recorder.as_mut() {
      rec.observe(&snapshot)?;
    }

    if max_ticks > 0 && scheduler.ticks() >= max_ticks {
      info!("达到指定周期数 {}, 退出调度循环", max_ticks);
      break;
    }
    if rx.try_recv().is_ok() {
      warn!("中断信号接收，退出调度循环");
      break;
    }

    sleep(period);
  }

  scheduler.shutdown();

  println!();
  println!("处理完成!");
  println!("总周期数: {}", scheduler.ticks());
  println!("推理次数: {}", scheduler.inferences());
  println!("发布次数: {}", scheduler.published());

  Ok(())
}
