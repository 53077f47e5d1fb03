// 该文件是 Qianli （千里眼） 项目的一部分。
// src/frame.rs - 帧定义
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

pub const RGB_CHANNELS: usize = 3;

/// 帧数据
///
/// 像素格式固定为交错排列的 8 位 RGB。帧由输入源产生并持有，
/// `latest_frame()` 返回的引用只在下一次获取之前有效；
/// 如需跨越调度周期保留，必须显式 `clone()`。
#[derive(Debug, Clone)]
pub struct Frame {
  /// 帧宽度（像素）
  width: u32,
  /// 帧高度（像素）
  height: u32,
  /// 单调递增的帧序号
  seq: u64,
  /// 相对输入源启动时刻的时间戳（毫秒）
  timestamp_ms: u64,
  /// RGB 像素数据
  data: Box<[u8]>,
}

impl Frame {
  pub fn new(width: u32, height: u32, seq: u64, timestamp_ms: u64, data: Vec<u8>) -> Self {
    Self {
      width,
      height,
      seq,
      timestamp_ms,
      data: data.into_boxed_slice(),
    }
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn seq(&self) -> u64 {
    self.seq
  }

  pub fn timestamp_ms(&self) -> u64 {
    self.timestamp_ms
  }

  pub fn data(&self) -> &[u8] {
    &self.data
  }

  /// 像素数据长度是否与声明的尺寸一致
  pub fn is_well_formed(&self) -> bool {
    self.width > 0
      && self.height > 0
      && self.data.len() == self.width as usize * self.height as usize * RGB_CHANNELS
  }
}
