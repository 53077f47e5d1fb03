// 该文件是 Qianli （千里眼） 项目的一部分。
// src/scheduler.rs - 推理调度器
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

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::{
  config::{ConfigError, PipelineConfig},
  decoder::{DecodeError, Decoder},
  detection::{self, DetectionSet},
  frame::Frame,
  model::{Engine, NoEngine},
  preprocess::{self, PreprocessError},
  source::FrameSource,
  store::DetectionStore,
};

#[derive(Error, Debug)]
pub enum SchedulerError {
  #[error("配置无效: {0}")]
  Config(#[from] ConfigError),
  #[error("模型输出形状校验失败: {0}")]
  Decode(#[from] DecodeError),
}

/// 单个推理周期内的失败
///
/// 这类错误被限制在调度器内部：记录日志、保留上一次发布的
/// 结果，然后继续运行。它们永远不会传播到调度驱动方。
#[derive(Error, Debug)]
enum TickError<E: std::error::Error> {
  #[error("帧预处理失败: {0}")]
  Preprocess(#[from] PreprocessError),
  #[error("推理引擎执行失败: {0}")]
  Engine(E),
  #[error("输出解码失败: {0}")]
  Decode(#[from] DecodeError),
}

enum EngineState<E> {
  /// 引擎与解码器就绪
  Ready {
    engine: E,
    decoder: Decoder,
    labels: Box<[String]>,
  },
  /// 推理停用模式：输入源照常运行，推理与发布被跳过
  Disabled,
}

/// 推理调度器
///
/// 调度循环以固定节奏调用 `on_tick()`（通常每个渲染帧一次），
/// 推理只在每 `inference_interval` 个周期尝试一次，以此把
/// 采集节奏与（更慢的）推理节奏解耦。单个周期的失败不会
/// 中止流水线。
pub struct Scheduler<S, E> {
  config: PipelineConfig,
  source: S,
  engine: EngineState<E>,
  store: Arc<DetectionStore>,
  tick: u64,
  busy: bool,
  inferences: u64,
  published: u64,
}

impl<S: FrameSource> Scheduler<S, NoEngine> {
  /// 构建推理停用模式的调度器
  ///
  /// 模型或标签装载失败时的显式降级状态：输入源照常运行，
  /// 每个周期的推理步骤被跳过，存储保持初始空集合。
  pub fn disabled(
    config: PipelineConfig,
    source: S,
    store: Arc<DetectionStore>,
  ) -> Result<Self, SchedulerError> {
    config.validate()?;
    warn!("调度器以推理停用模式启动");
    Ok(Self {
      config,
      source,
      engine: EngineState::Disabled,
      store,
      tick: 0,
      busy: false,
      inferences: 0,
      published: 0,
    })
  }
}

impl<S: FrameSource, E: Engine> Scheduler<S, E> {
  /// 构建完整的调度器
  ///
  /// 在此对引擎声明的输出形状做一次性解码校验，不被支持的
  /// 布局在启动时即失败，而不是在运行期反复报错。
  pub fn with_engine(
    config: PipelineConfig,
    source: S,
    store: Arc<DetectionStore>,
    engine: E,
    labels: Vec<String>,
  ) -> Result<Self, SchedulerError> {
    config.validate()?;
    let decoder = Decoder::for_output_shape(engine.output_shape(), &config)?;
    info!("调度器就绪，推理间隔: 每 {} 周期一次", config.inference_interval);
    Ok(Self {
      config,
      source,
      engine: EngineState::Ready {
        engine,
        decoder,
        labels: labels.into_boxed_slice(),
      },
      store,
      tick: 0,
      busy: false,
      inferences: 0,
      published: 0,
    })
  }

  pub fn is_inference_enabled(&self) -> bool {
    matches!(self.engine, EngineState::Ready { .. })
  }

  pub fn ticks(&self) -> u64 {
    self.tick
  }

  /// 已尝试的推理次数
  pub fn inferences(&self) -> u64 {
    self.inferences
  }

  /// 已成功发布的结果集数量
  pub fn published(&self) -> u64 {
    self.published
  }

  pub fn source(&self) -> &S {
    &self.source
  }

  pub fn source_mut(&mut self) -> &mut S {
    &mut self.source
  }

  /// 执行一个调度周期
  ///
  /// 推理间隔之外的周期、推理停用模式、输入源未运行或暂无帧，
  /// 都是空操作而非错误。周期内的任何失败只记录日志并保留
  /// 上一次发布的结果集（过期但自洽的数据优于闪烁清空）。
  pub fn on_tick(&mut self) {
    // 上一次推理仍未返回时不得开始新的尝试，
    // 保证任意时刻至多一个在途推理
    if self.busy {
      warn!("上一次推理尚未完成，本周期为空操作");
      return;
    }

    self.tick += 1;
    if self.tick % self.config.inference_interval != 0 {
      return;
    }

    let EngineState::Ready {
      engine,
      decoder,
      labels,
    } = &mut self.engine
    else {
      return;
    };

    if !self.source.is_running() {
      return;
    }
    let Some(frame) = self.source.latest_frame() else {
      // 帧缺席是预期中的稳态（启动阶段、提供者抖动）
      return;
    };

    self.busy = true;
    self.inferences += 1;
    let result = run_tick(engine, decoder, labels, &self.config, frame);
    self.busy = false;

    match result {
      Ok(set) => {
        debug!("发布帧 {} 的 {} 个检测结果", set.frame_seq, set.len());
        self.store.publish(set);
        self.published += 1;
      }
      Err(e) => {
        error!("推理周期失败，保留上一次发布的结果: {}", e);
      }
    }
  }

  /// 停止调度器并确定性释放输入源资源
  ///
  /// 在调度上下文中任意时刻调用都是安全的；重复调用是空操作。
  pub fn shutdown(&mut self) {
    self.source.stop();
    info!(
      "调度器关闭: {} 周期, {} 次推理, {} 次发布",
      self.tick, self.inferences, self.published
    );
  }
}

/// 单个推理周期：预处理 → 推理 → 解码 → 过滤
///
/// 产出的结果集只携带单一帧的序号，不会混合两代帧的框。
fn run_tick<E: Engine>(
  engine: &mut E,
  decoder: &Decoder,
  labels: &[String],
  config: &PipelineConfig,
  frame: &Frame,
) -> Result<DetectionSet, TickError<E::Error>> {
  let frame_seq = frame.seq();
  let frame_width = frame.width();
  let frame_height = frame.height();

  let input = preprocess::prepare(frame, config.model_input_width, config.model_input_height)?;
  let output = engine.execute(&input).map_err(TickError::Engine)?;
  let decoded = decoder.decode(&output, frame_width, frame_height, labels)?;
  let filtered = detection::filter(
    decoded,
    config.confidence_threshold,
    decoder.emits_overlapping_boxes(),
  );

  Ok(DetectionSet::new(frame_seq, filtered))
}
