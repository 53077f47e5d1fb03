// 该文件是 Qianli （千里眼） 项目的一部分。
// src/config.rs - 流水线配置
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

use thiserror::Error;

pub const DEFAULT_MODEL_INPUT_WIDTH: u32 = 416;
pub const DEFAULT_MODEL_INPUT_HEIGHT: u32 = 416;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const DEFAULT_INFERENCE_INTERVAL: u64 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
  #[error("模型输入尺寸必须为正数: {0}x{1}")]
  InvalidInputSize(u32, u32),
  #[error("置信度阈值必须在 [0,1] 之间: {0}")]
  InvalidConfidenceThreshold(f32),
  #[error("推理间隔必须为正数")]
  InvalidInferenceInterval,
}

/// 流水线配置
///
/// 启动时提供一次，运行期间不再变更；变更配置需要重建调度器与输入源。
#[derive(Debug, Clone)]
pub struct PipelineConfig {
  /// 模型输入宽度（必须与推理引擎期望一致）
  pub model_input_width: u32,
  /// 模型输入高度
  pub model_input_height: u32,
  /// 置信度阈值，低于此值的检测结果将被丢弃
  pub confidence_threshold: f32,
  /// 每 N 个调度周期尝试一次推理
  pub inference_interval: u64,
}

impl Default for PipelineConfig {
  fn default() -> Self {
    Self {
      model_input_width: DEFAULT_MODEL_INPUT_WIDTH,
      model_input_height: DEFAULT_MODEL_INPUT_HEIGHT,
      confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
      inference_interval: DEFAULT_INFERENCE_INTERVAL,
    }
  }
}

impl PipelineConfig {
  /// 校验配置取值范围
  pub fn validate(&self) -> Result<(), ConfigError> {
    if self.model_input_width == 0 || self.model_input_height == 0 {
      return Err(ConfigError::InvalidInputSize(
        self.model_input_width,
        self.model_input_height,
      ));
    }
    if !(0.0..=1.0).contains(&self.confidence_threshold) {
      return Err(ConfigError::InvalidConfidenceThreshold(
        self.confidence_threshold,
      ));
    }
    if self.inference_interval == 0 {
      return Err(ConfigError::InvalidInferenceInterval);
    }
    Ok(())
  }
}
