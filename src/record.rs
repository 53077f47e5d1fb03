// 该文件是 Qianli （千里眼） 项目的一部分。
// src/record.rs - 检测结果记录输出
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

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use crate::{FromUrl, FromUrlWithScheme, detection::DetectionSet};

#[derive(Error, Debug)]
pub enum RecordError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  Io(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  Json(#[from] serde_json::Error),
}

/// 检测结果记录器
///
/// 以可视化协作方的读取方式消费存储：每个驱动循环拉取一次
/// 快照，只在帧序号前进时追加一行 JSON 记录。
pub struct DetectionRecorder {
  path: PathBuf,
  writer: BufWriter<File>,
  last_seq: u64,
}

impl DetectionRecorder {
  pub fn create(path: PathBuf) -> Result<Self, RecordError> {
    let file = File::create(&path)?;
    info!("检测记录输出: {}", path.display());
    Ok(Self {
      path,
      writer: BufWriter::new(file),
      last_seq: 0,
    })
  }

  pub fn path(&self) -> &PathBuf {
    &self.path
  }

  /// 观察一次快照；帧序号未前进时为空操作
  pub fn observe(&mut self, set: &DetectionSet) -> Result<(), RecordError> {
    if set.frame_seq == 0 || set.frame_seq == self.last_seq {
      return Ok(());
    }
    self.last_seq = set.frame_seq;

    let detections: Vec<serde_json::Value> = set
      .detections
      .iter()
      .map(|det| {
        serde_json::json!({
          "class_id": det.class_id,
          "label": det.label,
          "confidence": det.confidence,
          "bbox": [det.x, det.y, det.width, det.height],
          "world": det.world,
        })
      })
      .collect();

    let line = serde_json::json!({
      "time": Utc::now().to_rfc3339(),
      "frame_seq": set.frame_seq,
      "detections": detections,
    });

    serde_json::to_writer(&mut self.writer, &line)?;
    self.writer.write_all(b"\n")?;
    self.writer.flush()?;
    Ok(())
  }
}

impl FromUrlWithScheme for DetectionRecorder {
  const SCHEME: &'static str = "record";
}

impl FromUrl for DetectionRecorder {
  type Error = RecordError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordError::SchemeMismatch);
    }
    Self::create(PathBuf::from(url.path()))
  }
}
