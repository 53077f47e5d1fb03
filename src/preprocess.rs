// 该文件是 Qianli （千里眼） 项目的一部分。
// src/preprocess.rs - 帧预处理
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

use image::RgbImage;
use thiserror::Error;

use crate::{
  frame::{Frame, RGB_CHANNELS},
  tensor::{Tensor, TensorError},
};

#[derive(Error, Debug)]
pub enum PreprocessError {
  #[error("无效帧: {width}x{height}, 像素数据 {len} 字节")]
  InvalidFrame { width: u32, height: u32, len: usize },
  #[error("无效目标尺寸: {0}x{1}")]
  InvalidTargetSize(u32, u32),
  #[error("张量构造失败: {0}")]
  Tensor(#[from] TensorError),
}

/// 将帧转换为模型输入张量
///
/// 双线性缩放到目标尺寸，像素值缩放到 [0,1]，
/// 输出形状为 `[1, target_height, target_width, 3]`。
/// 纯函数：不保留状态，相同输入产生相同输出。
pub fn prepare(
  frame: &Frame,
  target_width: u32,
  target_height: u32,
) -> Result<Tensor, PreprocessError> {
  if !frame.is_well_formed() {
    return Err(PreprocessError::InvalidFrame {
      width: frame.width(),
      height: frame.height(),
      len: frame.data().len(),
    });
  }
  if target_width == 0 || target_height == 0 {
    return Err(PreprocessError::InvalidTargetSize(
      target_width,
      target_height,
    ));
  }

  let image = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec()).ok_or(
    PreprocessError::InvalidFrame {
      width: frame.width(),
      height: frame.height(),
      len: frame.data().len(),
    },
  )?;

  let resized = image::imageops::resize(
    &image,
    target_width,
    target_height,
    image::imageops::FilterType::Triangle,
  );

  let data: Vec<f32> = resized
    .into_raw()
    .into_iter()
    .map(|v| v as f32 / 255.0)
    .collect();

  let tensor = Tensor::new(
    vec![
      1,
      target_height as usize,
      target_width as usize,
      RGB_CHANNELS,
    ],
    data,
  )?;

  Ok(tensor)
}
