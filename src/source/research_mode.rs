// 该文件是 Qianli （千里眼） 项目的一部分。
// src/source/research_mode.rs - 研究模式传感器输入源（占位）
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

use tracing::{info, warn};

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  source::{FrameSource, SourceError},
};

/// 头戴设备研究模式传感器的占位输入源
///
/// 状态机与真实设备提供者完全一致；在原生传感器通路接入之前
/// `latest_frame()` 无限期返回 None。这是合法的稳态行为，
/// 调度器把帧缺席当作预期情况处理，不报错也不中止。
//
// TODO: 接入设备端传感器流（帧到达后写入 slot 并递增 seq）。
pub struct ResearchModeSource {
  running: bool,
}

impl ResearchModeSource {
  pub fn new() -> Self {
    Self { running: false }
  }
}

impl Default for ResearchModeSource {
  fn default() -> Self {
    Self::new()
  }
}

impl FromUrlWithScheme for ResearchModeSource {
  const SCHEME: &'static str = "research";
}

impl FromUrl for ResearchModeSource {
  type Error = SourceError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SourceError::SchemeMismatch(url.scheme().to_string()));
    }
    Ok(Self::new())
  }
}

impl FrameSource for ResearchModeSource {
  fn start(&mut self) -> Result<(), SourceError> {
    if self.running {
      warn!("研究模式输入源已在运行，忽略重复的 start()");
      return Ok(());
    }
    self.running = true;
    warn!("研究模式传感器通路未接入，输入源将不产出帧");
    Ok(())
  }

  fn stop(&mut self) {
    if !self.running {
      return;
    }
    self.running = false;
    info!("研究模式输入源停止");
  }

  fn is_running(&self) -> bool {
    self.running
  }

  fn latest_frame(&mut self) -> Option<&Frame> {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn running_without_frames_is_valid_steady_state() {
    let mut source = ResearchModeSource::new();
    source.start().unwrap();
    assert!(source.is_running());
    for _ in 0..10 {
      assert!(source.latest_frame().is_none());
    }
  }

  #[test]
  fn state_machine_matches_live_providers() {
    let mut source = ResearchModeSource::new();
    assert!(!source.is_running());
    source.start().unwrap();
    assert!(source.start().is_ok());
    source.stop();
    source.stop();
    assert!(!source.is_running());
    source.start().unwrap();
    assert!(source.is_running());
  }
}
