// 该文件是 Qianli （千里眼） 项目的一部分。
// src/decoder.rs - 模型输出解码
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
use tracing::debug;

use crate::{config::PipelineConfig, detection::Detection, tensor::Tensor};

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("不支持的模型输出形状: {0:?}")]
  UnsupportedOutputShape(Vec<usize>),
}

/// 已知的输出张量布局族
///
/// 解码器只声明支持下列布局；其余形状在启动校验时直接拒绝，
/// 绝不按字节猜测语义。多张量（框/得分/类别分离）输出不在
/// 单输出引擎契约之内，同样被拒绝。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputFamily {
  /// 稠密网格预测 `[1, N, 5+C]`：每行为中心点+宽高（模型输入
  /// 像素单位）、目标置信度与 C 个类别得分，存在重叠重复框
  DenseGrid { rows: usize, attrs: usize },
  /// 平铺检测行 `[1, 1, N, 7]` 或 `[N, 7]`：每行为
  /// `[image_id, class_id, score, x1, y1, x2, y2]`，角点坐标已归一化
  DetectionRows { rows: usize },
}

/// 模型输出解码器
///
/// 在启动时针对声明的输出形状构建一次（快速失败），
/// 运行期对每个输出张量复核形状后解码。
pub struct Decoder {
  family: OutputFamily,
  expected_shape: Box<[usize]>,
  input_width: u32,
  input_height: u32,
}

impl Decoder {
  /// 针对模型声明的输出形状构建解码器
  ///
  /// 形状不属于任何已知布局族时返回 `UnsupportedOutputShape`，
  /// 该错误应在启动时出现一次，而不是每个周期反复出现。
  pub fn for_output_shape(
    shape: &[usize],
    config: &PipelineConfig,
  ) -> Result<Self, DecodeError> {
    let family = match *shape {
      [1, rows, attrs] if attrs >= 6 => OutputFamily::DenseGrid { rows, attrs },
      [1, 1, rows, 7] => OutputFamily::DetectionRows { rows },
      [rows, 7] => OutputFamily::DetectionRows { rows },
      _ => return Err(DecodeError::UnsupportedOutputShape(shape.to_vec())),
    };

    debug!("输出布局族: {:?}", family);

    Ok(Self {
      family,
      expected_shape: shape.to_vec().into_boxed_slice(),
      input_width: config.model_input_width,
      input_height: config.model_input_height,
    })
  }

  pub fn family(&self) -> &OutputFamily {
    &self.family
  }

  /// 该布局族是否会产出重叠的重复框（需要后续抑制）
  pub fn emits_overlapping_boxes(&self) -> bool {
    matches!(self.family, OutputFamily::DenseGrid { .. })
  }

  /// 将原始输出张量解码为检测候选
  ///
  /// 坐标统一归一化为相对原始帧尺寸的 [0,1] 图像分数。
  /// 类别索引超出标签表时产出空字符串标签而非失败。
  /// 运行期形状漂移按周期内错误报告，由调度器记录并跳过。
  pub fn decode(
    &self,
    output: &Tensor,
    frame_width: u32,
    frame_height: u32,
    labels: &[String],
  ) -> Result<Vec<Detection>, DecodeError> {
    if output.shape() != &*self.expected_shape {
      return Err(DecodeError::UnsupportedOutputShape(output.shape().to_vec()));
    }

    let detections = match self.family {
      OutputFamily::DenseGrid { rows, attrs } => {
        self.decode_dense_grid(output.data(), rows, attrs, frame_width, frame_height, labels)
      }
      OutputFamily::DetectionRows { rows } => self.decode_rows(output.data(), rows, labels),
    };

    Ok(detections)
  }

  fn decode_dense_grid(
    &self,
    data: &[f32],
    rows: usize,
    attrs: usize,
    frame_width: u32,
    frame_height: u32,
    labels: &[String],
  ) -> Vec<Detection> {
    let num_classes = attrs - 5;
    let scale_x = frame_width as f32 / self.input_width as f32;
    let scale_y = frame_height as f32 / self.input_height as f32;
    let frame_w = frame_width as f32;
    let frame_h = frame_height as f32;

    let mut detections = Vec::new();

    for row in 0..rows {
      let base = row * attrs;
      let objectness = data[base + 4];

      // 置信度为零的行是填充或背景，直接跳过
      if objectness <= 0.0 {
        continue;
      }

      let mut best_score = 0.0f32;
      let mut best_class = 0usize;
      for class_id in 0..num_classes {
        let score = data[base + 5 + class_id];
        if score > best_score {
          best_score = score;
          best_class = class_id;
        }
      }

      let confidence = objectness * best_score;
      if confidence <= 0.0 {
        continue;
      }

      // 中心点+宽高（模型输入像素）→ 原始帧像素 → 图像分数
      let cx = data[base];
      let cy = data[base + 1];
      let w = data[base + 2];
      let h = data[base + 3];

      let px = (cx - w / 2.0) * scale_x;
      let py = (cy - h / 2.0) * scale_y;
      let pw = w * scale_x;
      let ph = h * scale_y;

      let x = (px / frame_w).clamp(0.0, 1.0);
      let y = (py / frame_h).clamp(0.0, 1.0);
      let width = (pw / frame_w).clamp(0.0, 1.0 - x);
      let height = (ph / frame_h).clamp(0.0, 1.0 - y);

      if width <= 0.0 || height <= 0.0 {
        continue;
      }

      detections.push(Detection::new(
        best_class,
        label_for(labels, best_class),
        confidence,
        x,
        y,
        width,
        height,
      ));
    }

    detections
  }

  fn decode_rows(&self, data: &[f32], rows: usize, labels: &[String]) -> Vec<Detection> {
    const ROW_ATTRS: usize = 7;

    let mut detections = Vec::new();

    for row in 0..rows {
      let base = row * ROW_ATTRS;
      let image_id = data[base];
      let class_raw = data[base + 1];
      let confidence = data[base + 2];

      // image_id 或 class_id 为负表示填充行
      if image_id < 0.0 || class_raw < 0.0 || confidence <= 0.0 {
        continue;
      }

      let class_id = class_raw as usize;

      // 角点坐标已经是图像分数，只需裁剪
      let x1 = data[base + 3].clamp(0.0, 1.0);
      let y1 = data[base + 4].clamp(0.0, 1.0);
      let x2 = data[base + 5].clamp(0.0, 1.0);
      let y2 = data[base + 6].clamp(0.0, 1.0);

      let width = x2 - x1;
      let height = y2 - y1;
      if width <= 0.0 || height <= 0.0 {
        continue;
      }

      detections.push(Detection::new(
        class_id,
        label_for(labels, class_id),
        confidence,
        x1,
        y1,
        width,
        height,
      ));
    }

    detections
  }
}

/// 标签表查询；越界索引产出空字符串而非错误
fn label_for(labels: &[String], class_id: usize) -> String {
  labels.get(class_id).cloned().unwrap_or_default()
}
