// 该文件是 Qianli （千里眼） 项目的一部分。
// src/source.rs - 帧输入源抽象
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

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

mod research_mode;
mod synthetic;
#[cfg(feature = "v4l2_camera")]
mod v4l2_camera;

pub use self::research_mode::ResearchModeSource;
pub use self::synthetic::SyntheticSource;
#[cfg(feature = "v4l2_camera")]
pub use self::v4l2_camera::V4l2CameraSource;

#[derive(Error, Debug)]
pub enum SourceError {
  /// 采集资源不可用（无设备或已被占用），`start()` 的致命错误
  #[error("无法获取采集设备: {0}")]
  Acquisition(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("无效的输入源参数: {0}")]
  InvalidParameter(String),
}

/// 帧输入源
///
/// 状态机只有 {Stopped, Running} 两态，初始为 Stopped，
/// 任何终态都可以重新 `start()`。帧缓冲归输入源独占所有，
/// `latest_frame()` 的返回引用只在下一次调用之前有效。
pub trait FrameSource {
  /// Stopped → Running，获取底层采集资源
  ///
  /// 设备不可用或已被占用时返回 `SourceError::Acquisition`；
  /// Running 状态下的重复调用记录警告后忽略，以容忍冗余的
  /// 驱动层调用。
  fn start(&mut self) -> Result<(), SourceError>;

  /// Running → Stopped，确定性释放资源；对已停止的源是空操作
  fn stop(&mut self);

  fn is_running(&self) -> bool;

  /// 最近产出的帧
  ///
  /// Stopped 状态恒为 None；Running 状态下尚无帧到达时也为
  /// None。帧缺席是预期中的稳态，不是错误。
  fn latest_frame(&mut self) -> Option<&Frame>;
}

/// 按提供者类型标签分发的输入源包装
///
/// 提供者由配置（URL 方案）选择，而不是由继承层次决定。
pub enum SourceWrapper {
  Synthetic(SyntheticSource),
  ResearchMode(ResearchModeSource),
  #[cfg(feature = "v4l2_camera")]
  V4l2(V4l2CameraSource),
}

impl FromUrl for SourceWrapper {
  type Error = SourceError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    if url.scheme() == SyntheticSource::SCHEME {
      return Ok(SourceWrapper::Synthetic(SyntheticSource::from_url(url)?));
    }
    if url.scheme() == ResearchModeSource::SCHEME {
      return Ok(SourceWrapper::ResearchMode(ResearchModeSource::from_url(
        url,
      )?));
    }
    #[cfg(feature = "v4l2_camera")]
    if url.scheme() == V4l2CameraSource::SCHEME {
      return Ok(SourceWrapper::V4l2(V4l2CameraSource::from_url(url)?));
    }
    Err(SourceError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl FrameSource for SourceWrapper {
  fn start(&mut self) -> Result<(), SourceError> {
    match self {
      SourceWrapper::Synthetic(source) => source.start(),
      SourceWrapper::ResearchMode(source) => source.start(),
      #[cfg(feature = "v4l2_camera")]
      SourceWrapper::V4l2(source) => source.start(),
    }
  }

  fn stop(&mut self) {
    match self {
      SourceWrapper::Synthetic(source) => source.stop(),
      SourceWrapper::ResearchMode(source) => source.stop(),
      #[cfg(feature = "v4l2_camera")]
      SourceWrapper::V4l2(source) => source.stop(),
    }
  }

  fn is_running(&self) -> bool {
    match self {
      SourceWrapper::Synthetic(source) => source.is_running(),
      SourceWrapper::ResearchMode(source) => source.is_running(),
      #[cfg(feature = "v4l2_camera")]
      SourceWrapper::V4l2(source) => source.is_running(),
    }
  }

  fn latest_frame(&mut self) -> Option<&Frame> {
    match self {
      SourceWrapper::Synthetic(source) => source.latest_frame(),
      SourceWrapper::ResearchMode(source) => source.latest_frame(),
      #[cfg(feature = "v4l2_camera")]
      SourceWrapper::V4l2(source) => source.latest_frame(),
    }
  }
}
