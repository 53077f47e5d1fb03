// 该文件是 Qianli （千里眼） 项目的一部分。
// src/model.rs - 推理引擎边界
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

use crate::tensor::Tensor;

/// 推理引擎
///
/// 同步执行，延迟有界但不固定。引擎内部可以把计算卸载到
/// 工作线程或加速器，但对调度器呈现为单次阻塞调用。
/// `output_shape()` 供启动期的一次性解码校验使用。
pub trait Engine {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 模型声明的输出张量形状
  fn output_shape(&self) -> &[usize];

  /// 对准备好的输入张量执行一次推理
  fn execute(&mut self, input: &Tensor) -> Result<Tensor, Self::Error>;
}

/// 模型/标签装载协作方的启动期错误
///
/// 这类错误只在启动时报告一次，流水线随后进入“推理停用”
/// 模式继续运行，而不是崩溃退出。
#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型加载失败: {0}")]
  Load(String),
  #[error("标签加载失败: {0}")]
  Label(String),
}

/// 推理停用模式下的引擎占位类型
///
/// 不可构造；`Scheduler::disabled` 借助它保持类型参数封闭。
#[derive(Debug)]
pub enum NoEngine {}

#[derive(Error, Debug)]
#[error("推理引擎不可用")]
pub struct NoEngineError;

impl Engine for NoEngine {
  type Error = NoEngineError;

  fn output_shape(&self) -> &[usize] {
    match *self {}
  }

  fn execute(&mut self, _input: &Tensor) -> Result<Tensor, Self::Error> {
    match *self {}
  }
}
