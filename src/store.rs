// 该文件是 Qianli （千里眼） 项目的一部分。
// src/store.rs - 检测结果存储
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

use std::sync::{Arc, RwLock};

use crate::detection::DetectionSet;

/// 当前检测结果的唯一持有者
///
/// `publish` 以原子交换替换整个集合，`snapshot` 克隆 `Arc`。
/// 读取方拿到的要么是初始空集合，要么是某个完整发布过的集合，
/// 绝不会观察到撕裂的中间状态。发布与读取可以并发进行。
pub struct DetectionStore {
  current: RwLock<Arc<DetectionSet>>,
}

impl Default for DetectionStore {
  fn default() -> Self {
    Self::new()
  }
}

impl DetectionStore {
  pub fn new() -> Self {
    Self {
      current: RwLock::new(Arc::new(DetectionSet::default())),
    }
  }

  /// 整体替换当前集合
  pub fn publish(&self, set: DetectionSet) {
    let set = Arc::new(set);
    let mut guard = self
      .current
      .write()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = set;
  }

  /// 读取当前集合的一致快照
  pub fn snapshot(&self) -> Arc<DetectionSet> {
    let guard = self
      .current
      .read()
      .unwrap_or_else(|poisoned| poisoned.into_inner());
    Arc::clone(&guard)
  }
}
