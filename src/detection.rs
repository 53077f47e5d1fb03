// 该文件是 Qianli （千里眼） 项目的一部分。
// src/detection.rs - 检测结果模型与过滤
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

/// 同类别边界框的重叠抑制阈值（IoU）
pub const NMS_IOU_THRESHOLD: f32 = 0.45;

/// 单个检测结果
///
/// 边界框坐标为相对原始帧尺寸归一化的 [0,1] 图像分数，
/// 构造后不可变。
#[derive(Debug, Clone)]
pub struct Detection {
  /// 类别索引
  pub class_id: usize,
  /// 类别名称（标签表未覆盖时为空字符串）
  pub label: String,
  /// 置信度
  pub confidence: f32,
  /// 边界框左上角 x 坐标
  pub x: f32,
  /// 边界框左上角 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 可选的三维世界坐标，仅由外部深度/位姿协作方提供
  pub world: Option<[f32; 3]>,
}

impl Detection {
  pub fn new(
    class_id: usize,
    label: String,
    confidence: f32,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
  ) -> Self {
    Self {
      class_id,
      label,
      confidence,
      x,
      y,
      width,
      height,
      world: None,
    }
  }

  /// 由深度/位姿协作方补充三维世界坐标
  pub fn with_world(mut self, world: [f32; 3]) -> Self {
    self.world = Some(world);
    self
  }
}

/// 一代帧的完整检测结果集合
///
/// 集合只会被整体替换，不会就地修改，因此读取方看到的
/// 永远是同一帧序号下的自洽结果。
#[derive(Debug, Clone, Default)]
pub struct DetectionSet {
  /// 来源帧的序号
  pub frame_seq: u64,
  /// 按置信度降序排列的检测结果
  pub detections: Box<[Detection]>,
}

impl DetectionSet {
  pub fn new(frame_seq: u64, detections: Vec<Detection>) -> Self {
    Self {
      frame_seq,
      detections: detections.into_boxed_slice(),
    }
  }

  pub fn len(&self) -> usize {
    self.detections.len()
  }

  pub fn is_empty(&self) -> bool {
    self.detections.is_empty()
  }
}

/// 过滤检测候选
///
/// 丢弃置信度低于阈值的条目；当解码族会产生重叠的重复框时，
/// 额外执行同类别的贪心非极大值抑制。输出按置信度降序排列。
pub fn filter(
  mut detections: Vec<Detection>,
  confidence_threshold: f32,
  suppress_overlaps: bool,
) -> Vec<Detection> {
  detections.retain(|det| det.confidence >= confidence_threshold);
  detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

  if suppress_overlaps {
    detections = nms(detections);
  }

  detections
}

/// 非极大值抑制
///
/// 输入必须已按置信度降序排列。
fn nms(mut detections: Vec<Detection>) -> Vec<Detection> {
  let mut result = Vec::with_capacity(detections.len());

  while !detections.is_empty() {
    let best = detections.remove(0);

    detections.retain(|det| {
      if det.class_id != best.class_id {
        return true;
      }
      iou(&best, det) < NMS_IOU_THRESHOLD
    });

    result.push(best);
  }

  result
}

/// 计算两个边界框的 IoU
pub fn iou(a: &Detection, b: &Detection) -> f32 {
  let x1 = a.x.max(b.x);
  let y1 = a.y.max(b.y);
  let x2 = (a.x + a.width).min(b.x + b.width);
  let y2 = (a.y + a.height).min(b.y + b.height);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = a.width * a.height;
  let area_b = b.width * b.height;
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
