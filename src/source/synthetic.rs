// 该文件是 Qianli （千里眼） 项目的一部分。
// src/source/synthetic.rs - 合成帧输入源
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

use std::time::Instant;

use tracing::{info, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, RGB_CHANNELS},
  source::{FrameSource, SourceError},
};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

/// 合成帧输入源
///
/// 确定性地生成渐变背景加移动目标方块的帧序列，
/// 用于无硬件环境下驱动整条流水线。
pub struct SyntheticSource {
  width: u32,
  height: u32,
  running: bool,
  seq: u64,
  started_at: Option<Instant>,
  slot: Option<Frame>,
}

impl SyntheticSource {
  pub fn new(width: u32, height: u32) -> Self {
    Self {
      width,
      height,
      running: false,
      seq: 0,
      started_at: None,
      slot: None,
    }
  }

  /// 渲染一帧：水平渐变背景，白色目标方块随帧序号移动
  fn render(&self, seq: u64) -> Frame {
    let w = self.width as usize;
    let h = self.height as usize;
    let mut data = vec![0u8; w * h * RGB_CHANNELS];

    for y in 0..h {
      for x in 0..w {
        let base = (y * w + x) * RGB_CHANNELS;
        data[base] = (x * 255 / w.max(1)) as u8;
        data[base + 1] = (y * 255 / h.max(1)) as u8;
        data[base + 2] = 64;
      }
    }

    let square = (w.min(h) / 8).max(1);
    let max_x = w.saturating_sub(square);
    let max_y = h.saturating_sub(square);
    let offset_x = if max_x > 0 { (seq as usize * 7) % max_x } else { 0 };
    let offset_y = if max_y > 0 { (seq as usize * 3) % max_y } else { 0 };

    for y in offset_y..offset_y + square {
      for x in offset_x..offset_x + square {
        let base = (y * w + x) * RGB_CHANNELS;
        data[base] = 255;
        data[base + 1] = 255;
        data[base + 2] = 255;
      }
    }

    let timestamp_ms = self
      .started_at
      .map(|t| t.elapsed().as_millis() as u64)
      .unwrap_or(0);

    Frame::new(self.width, self.height, seq, timestamp_ms, data)
  }
}

impl FromUrlWithScheme for SyntheticSource {
  const SCHEME: &'static str = "synthetic";
}

impl FromUrl for SyntheticSource {
  type Error = SourceError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch(url.scheme().to_string()));
    }

    let mut width = DEFAULT_WIDTH;
    let mut height = DEFAULT_HEIGHT;
    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "width" => {
          width = value
            .parse()
            .map_err(|_| SourceError::InvalidParameter(format!("width={}", value)))?;
        }
        "height" => {
          height = value
            .parse()
            .map_err(|_| SourceError::InvalidParameter(format!("height={}", value)))?;
        }
        _ => {}
      }
    }

    if width == 0 || height == 0 {
      return Err(SourceError::InvalidParameter(format!(
        "帧尺寸必须为正数: {}x{}",
        width, height
      )));
    }

    Ok(Self::new(width, height))
  }
}

impl FrameSource for SyntheticSource {
  fn start(&mut self) -> Result<(), SourceError> {
    if self.running {
      warn!("合成输入源已在运行，忽略重复的 start()");
      return Ok(());
    }
    self.running = true;
    self.started_at = Some(Instant::now());
    info!("合成输入源启动: {}x{}", self.width, self.height);
    Ok(())
  }

  fn stop(&mut self) {
    if !self.running {
      return;
    }
    self.running = false;
    self.slot = None;
    info!("合成输入源停止");
  }

  fn is_running(&self) -> bool {
    self.running
  }

  fn latest_frame(&mut self) -> Option<&Frame> {
    if !self.running {
      return None;
    }
    self.seq += 1;
    self.slot = Some(self.render(self.seq));
    self.slot.as_ref()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn stopped_source_yields_no_frames() {
    let mut source = SyntheticSource::new(32, 32);
    assert!(!source.is_running());
    assert!(source.latest_frame().is_none());
  }

  #[test]
  fn running_source_produces_monotonic_seq() {
    let mut source = SyntheticSource::new(32, 32);
    source.start().unwrap();
    let first = source.latest_frame().unwrap().seq();
    let second = source.latest_frame().unwrap().seq();
    assert!(second > first);
  }

  #[test]
  fn frames_are_well_formed() {
    let mut source = SyntheticSource::new(31, 17);
    source.start().unwrap();
    let frame = source.latest_frame().unwrap();
    assert!(frame.is_well_formed());
    assert_eq!(frame.width(), 31);
    assert_eq!(frame.height(), 17);
  }

  #[test]
  fn redundant_start_is_ignored() {
    let mut source = SyntheticSource::new(32, 32);
    source.start().unwrap();
    assert!(source.start().is_ok());
    assert!(source.is_running());
  }

  #[test]
  fn stop_is_idempotent_and_restartable() {
    let mut source = SyntheticSource::new(32, 32);
    source.start().unwrap();
    source.latest_frame();
    source.stop();
    source.stop();
    assert!(!source.is_running());
    assert!(source.latest_frame().is_none());
    // 任何终态都可以重新启动
    source.start().unwrap();
    assert!(source.latest_frame().is_some());
  }

  #[test]
  fn seq_stays_monotonic_across_restart() {
    let mut source = SyntheticSource::new(32, 32);
    source.start().unwrap();
    let before = source.latest_frame().unwrap().seq();
    source.stop();
    source.start().unwrap();
    let after = source.latest_frame().unwrap().seq();
    assert!(after > before);
  }
}
