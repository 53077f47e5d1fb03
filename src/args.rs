// 该文件是 Qianli （千里眼） 项目的一部分。
// src/args.rs - 项目参数配置
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

use clap::Parser;
use url::Url;

use qianli::config;

/// Qianli 流水线参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入源 URL
  /// 支持方案:
  /// - synthetic://feed?width=640&height=480
  /// - research://pv
  /// - v4l2:///dev/video0?width=640&height=480
  #[arg(long, value_name = "SOURCE", default_value = "synthetic://feed")]
  pub source: Url,

  /// 模型 URL
  /// demo://grid 使用内置演示引擎；其它方案装载失败后
  /// 流水线进入推理停用模式继续运行
  #[arg(long, value_name = "MODEL", default_value = "demo://grid")]
  pub model: Url,

  /// 检测记录输出 URL（record:///tmp/detections.jsonl）
  #[arg(long, value_name = "RECORD")]
  pub record: Option<Url>,

  /// 模型输入宽度
  #[arg(long, default_value_t = config::DEFAULT_MODEL_INPUT_WIDTH, value_name = "PIXELS")]
  pub input_width: u32,

  /// 模型输入高度
  #[arg(long, default_value_t = config::DEFAULT_MODEL_INPUT_HEIGHT, value_name = "PIXELS")]
  pub input_height: u32,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value_t = config::DEFAULT_CONFIDENCE_THRESHOLD, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// 每 N 个调度周期尝试一次推理
  #[arg(long, default_value_t = config::DEFAULT_INFERENCE_INTERVAL, value_name = "N")]
  pub interval: u64,

  /// 调度周期频率（每秒周期数）
  #[arg(long, default_value_t = 30.0, value_name = "HZ")]
  pub tick_hz: f64,

  /// 最大调度周期数（0 表示无限制）
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub max_ticks: u64,
}
