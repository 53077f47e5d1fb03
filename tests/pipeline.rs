// 该文件是 Qianli （千里眼） 项目的一部分。
// tests/pipeline.rs - 流水线端到端测试
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

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use thiserror::Error;

use qianli::config::PipelineConfig;
use qianli::model::Engine;
use qianli::scheduler::{Scheduler, SchedulerError};
use qianli::source::{FrameSource, ResearchModeSource, SyntheticSource};
use qianli::store::DetectionStore;
use qianli::tensor::Tensor;

#[derive(Error, Debug)]
#[error("模拟引擎故障")]
struct MockEngineError;

const MOCK_ROWS: usize = 8;
const MOCK_ATTRS: usize = 6;

/// 可脚本化的模拟推理引擎
///
/// 输出稠密网格布局的单目标张量，记录调用次数与最近一次
/// 输入的形状，可随时切换为故障模式。
struct MockEngine {
  shape: Vec<usize>,
  input_width: f32,
  input_height: f32,
  calls: Arc<AtomicU64>,
  fail: Arc<AtomicBool>,
  last_input_shape: Arc<Mutex<Option<Vec<usize>>>>,
}

impl MockEngine {
  fn new(config: &PipelineConfig) -> Self {
    Self {
      shape: vec![1, MOCK_ROWS, MOCK_ATTRS],
      input_width: config.model_input_width as f32,
      input_height: config.model_input_height as f32,
      calls: Arc::new(AtomicU64::new(0)),
      fail: Arc::new(AtomicBool::new(false)),
      last_input_shape: Arc::new(Mutex::new(None)),
    }
  }

  fn calls(&self) -> Arc<AtomicU64> {
    Arc::clone(&self.calls)
  }

  fn fail_flag(&self) -> Arc<AtomicBool> {
    Arc::clone(&self.fail)
  }

  fn last_input_shape(&self) -> Arc<Mutex<Option<Vec<usize>>>> {
    Arc::clone(&self.last_input_shape)
  }
}

impl Engine for MockEngine {
  type Error = MockEngineError;

  fn output_shape(&self) -> &[usize] {
    &self.shape
  }

  fn execute(&mut self, input: &Tensor) -> Result<Tensor, Self::Error> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.last_input_shape.lock().unwrap() = Some(input.shape().to_vec());
    assert!(
      input.data().iter().all(|&v| (0.0..=1.0).contains(&v)),
      "输入张量必须归一化到 [0,1]"
    );

    if self.fail.load(Ordering::SeqCst) {
      return Err(MockEngineError);
    }

    let mut data = vec![0.0f32; MOCK_ROWS * MOCK_ATTRS];
    data[0] = self.input_width / 2.0;
    data[1] = self.input_height / 2.0;
    data[2] = self.input_width / 4.0;
    data[3] = self.input_height / 4.0;
    data[4] = 0.9;
    data[5] = 0.95;
    Ok(Tensor::new(self.shape.clone(), data).unwrap())
  }
}

fn running_source(width: u32, height: u32) -> SyntheticSource {
  let mut source = SyntheticSource::new(width, height);
  source.start().unwrap();
  source
}

#[test]
fn interval_five_over_twelve_ticks_invokes_engine_twice() {
  let config = PipelineConfig {
    inference_interval: 5,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);
  let calls = engine.calls();

  let mut scheduler = Scheduler::with_engine(
    config,
    running_source(64, 48),
    Arc::clone(&store),
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  for _ in 0..12 {
    scheduler.on_tick();
  }

  // 第 5 和第 10 周期各推理一次
  assert_eq!(calls.load(Ordering::SeqCst), 2);
  assert_eq!(scheduler.inferences(), 2);
  assert_eq!(scheduler.published(), 2);
}

#[test]
fn engine_invoked_exactly_once_per_interval() {
  let config = PipelineConfig {
    inference_interval: 3,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);
  let calls = engine.calls();

  let mut scheduler = Scheduler::with_engine(
    config,
    running_source(64, 48),
    store,
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  for tick in 1..=9u64 {
    scheduler.on_tick();
    assert_eq!(calls.load(Ordering::SeqCst), tick / 3);
  }
}

#[test]
fn scheduler_passes_configured_input_dimensions() {
  let config = PipelineConfig {
    model_input_width: 320,
    model_input_height: 240,
    inference_interval: 1,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);
  let last_shape = engine.last_input_shape();

  let mut scheduler = Scheduler::with_engine(
    config,
    running_source(64, 48),
    store,
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  scheduler.on_tick();

  assert_eq!(
    last_shape.lock().unwrap().as_deref(),
    Some(&[1, 240, 320, 3][..])
  );
}

#[test]
fn published_set_tracks_single_frame_generation() {
  let config = PipelineConfig {
    inference_interval: 5,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);

  let mut scheduler = Scheduler::with_engine(
    config,
    running_source(64, 48),
    Arc::clone(&store),
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  let mut seen = Vec::new();
  for _ in 0..25 {
    scheduler.on_tick();
    let snapshot = store.snapshot();
    if seen.last() != Some(&snapshot.frame_seq) {
      seen.push(snapshot.frame_seq);
    }
  }

  // 合成源每次推理周期产出一帧：发布的帧序号严格递增且无混代
  assert_eq!(seen, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn engine_failure_retains_previous_snapshot() {
  let config = PipelineConfig {
    inference_interval: 1,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);
  let calls = engine.calls();
  let fail = engine.fail_flag();

  let mut scheduler = Scheduler::with_engine(
    config,
    running_source(64, 48),
    Arc::clone(&store),
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  scheduler.on_tick();
  let before = store.snapshot();
  assert_eq!(before.frame_seq, 1);
  assert!(!before.is_empty());

  fail.store(true, Ordering::SeqCst);
  for _ in 0..5 {
    scheduler.on_tick();
  }

  // 引擎持续被调用，但失败的周期不会清空也不会替换已发布的集合
  let after = store.snapshot();
  assert_eq!(calls.load(Ordering::SeqCst), 6);
  assert!(Arc::ptr_eq(&before, &after));
  assert_eq!(scheduler.published(), 1);

  // 故障恢复后继续发布
  fail.store(false, Ordering::SeqCst);
  scheduler.on_tick();
  assert_eq!(store.snapshot().frame_seq, 7);
  assert_eq!(scheduler.published(), 2);
}

#[test]
fn stopped_source_never_invokes_engine() {
  let config = PipelineConfig {
    inference_interval: 1,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);
  let calls = engine.calls();

  // 从未启动的输入源
  let mut scheduler = Scheduler::with_engine(
    config,
    SyntheticSource::new(64, 48),
    Arc::clone(&store),
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  for _ in 0..20 {
    scheduler.on_tick();
  }

  assert_eq!(calls.load(Ordering::SeqCst), 0);
  let snapshot = store.snapshot();
  assert_eq!(snapshot.frame_seq, 0);
  assert!(snapshot.is_empty());
}

#[test]
fn research_mode_source_is_valid_frameless_steady_state() {
  let config = PipelineConfig {
    inference_interval: 1,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);
  let calls = engine.calls();

  let mut source = ResearchModeSource::new();
  source.start().unwrap();
  let mut scheduler = Scheduler::with_engine(
    config,
    source,
    Arc::clone(&store),
    engine,
    vec!["target".to_string()],
  )
  .unwrap();

  for _ in 0..20 {
    scheduler.on_tick();
  }

  // 输入源在运行但无限期不产帧：不推理、不发布、不报错
  assert_eq!(calls.load(Ordering::SeqCst), 0);
  assert!(store.snapshot().is_empty());
  assert_eq!(scheduler.ticks(), 20);
}

#[test]
fn unsupported_output_shape_fails_at_startup() {
  let config = PipelineConfig::default();
  let mut engine = MockEngine::new(&config);
  engine.shape = vec![3, 3];

  let result = Scheduler::with_engine(
    config,
    SyntheticSource::new(64, 48),
    Arc::new(DetectionStore::new()),
    engine,
    vec![],
  );
  assert!(matches!(result, Err(SchedulerError::Decode(_))));
}

#[test]
fn invalid_config_fails_at_startup() {
  let config = PipelineConfig {
    confidence_threshold: 2.0,
    ..Default::default()
  };
  let engine = MockEngine::new(&config);
  let result = Scheduler::with_engine(
    config,
    SyntheticSource::new(64, 48),
    Arc::new(DetectionStore::new()),
    engine,
    vec![],
  );
  assert!(matches!(result, Err(SchedulerError::Config(_))));
}

#[test]
fn detections_carry_labels_from_supplied_table() {
  let config = PipelineConfig {
    inference_interval: 1,
    ..Default::default()
  };
  let store = Arc::new(DetectionStore::new());
  let engine = MockEngine::new(&config);

  let mut scheduler = Scheduler::with_engine(
    config,
    running_source(64, 48),
    Arc::clone(&store),
    engine,
    vec!["headset".to_string()],
  )
  .unwrap();

  scheduler.on_tick();

  let snapshot = store.snapshot();
  assert_eq!(snapshot.len(), 1);
  let det = &snapshot.detections[0];
  assert_eq!(det.label, "headset");
  assert!(det.confidence >= 0.5);
  assert!(det.x >= 0.0 && det.x <= 1.0);
  assert!(det.width > 0.0 && det.x + det.width <= 1.0);
  assert!(det.world.is_none());
}
