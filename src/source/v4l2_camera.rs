// 该文件是 Qianli （千里眼） 项目的一部分。
// src/source/v4l2_camera.rs - V4L2 摄像头输入源
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

use std::pin::Pin;
use std::time::Instant;

use tracing::{info, warn};
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture as _;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::{Frame, RGB_CHANNELS},
  source::{FrameSource, SourceError},
};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const STREAM_BUFFERS: u32 = 4;

/// 运行期采集状态
///
/// 由于 v4l 库的 Stream 需要引用 Device，这里使用 Pin<Box>
/// 固定 Device 的内存地址，从而可以安全地创建引用它的 Stream。
struct Capture {
  /// V4L2 设备（固定内存位置）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 关联）
  stream: Option<Stream<'static>>,
  width: u32,
  height: u32,
  started_at: Instant,
}

impl Capture {
  fn open(device_path: &str, width: u32, height: u32) -> Result<Self, SourceError> {
    let device = Box::pin(
      Device::with_path(device_path)
        .map_err(|e| SourceError::Acquisition(format!("无法打开设备 {}: {}", device_path, e)))?,
    );

    // 设置视频格式；驱动可能调整为最接近的受支持尺寸
    let mut format = device
      .format()
      .map_err(|e| SourceError::Acquisition(format!("无法查询格式: {}", e)))?;
    format.width = width;
    format.height = height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device
      .set_format(&format)
      .map_err(|e| SourceError::Acquisition(format!("无法设置格式: {}", e)))?;

    let mut capture = Self {
      device,
      stream: None,
      width: format.width,
      height: format.height,
      started_at: Instant::now(),
    };

    let device_ref: &Device = &capture.device;
    let stream = unsafe {
      // SAFETY: 将设备引用的生命周期延长到 'static 是安全的，因为:
      // 1. device 被 Pin<Box> 固定在堆上，不会移动
      // 2. stream 与 device 存放在同一个结构体中
      // 3. Drop 顺序保证 stream (Option::take) 先于 device 释放
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, STREAM_BUFFERS)
        .map_err(|e| SourceError::Acquisition(format!("无法创建捕获流: {}", e)))?
    };

    capture.stream = Some(stream);
    Ok(capture)
  }
}

impl Drop for Capture {
  fn drop(&mut self) {
    // 确保 stream 在 device 之前被 drop
    self.stream.take();
  }
}

/// V4L2 摄像头输入源
///
/// 设备以原生速率产出帧；每次 `latest_frame()` 出队一个缓冲，
/// 转换为 RGB 后写入自有的帧槽位。
pub struct V4l2CameraSource {
  device_path: String,
  requested_width: u32,
  requested_height: u32,
  capture: Option<Capture>,
  seq: u64,
  slot: Option<Frame>,
}

impl V4l2CameraSource {
  pub fn new(device_path: &str, width: u32, height: u32) -> Self {
    Self {
      device_path: device_path.to_string(),
      requested_width: width,
      requested_height: height,
      capture: None,
      seq: 0,
      slot: None,
    }
  }

  /// 将 YUYV 格式转换为 RGB
  fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height) as usize * RGB_CHANNELS);

    for chunk in yuyv.chunks(4) {
      if chunk.len() < 4 {
        break;
      }

      let y0 = chunk[0] as f32;
      let u = chunk[1] as f32 - 128.0;
      let y1 = chunk[2] as f32;
      let v = chunk[3] as f32 - 128.0;

      // 第一个像素
      let r = (y0 + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y0 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y0 + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);

      // 第二个像素
      let r = (y1 + 1.402 * v).clamp(0.0, 255.0) as u8;
      let g = (y1 - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
      let b = (y1 + 1.772 * u).clamp(0.0, 255.0) as u8;
      rgb.extend_from_slice(&[r, g, b]);
    }

    rgb
  }
}

impl FromUrlWithScheme for V4l2CameraSource {
  const SCHEME: &'static str = "v4l2";
}

impl FromUrl for V4l2CameraSource {
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

    Ok(Self::new(url.path(), width, height))
  }
}

impl FrameSource for V4l2CameraSource {
  fn start(&mut self) -> Result<(), SourceError> {
    if self.capture.is_some() {
      warn!("摄像头输入源已在运行，忽略重复的 start()");
      return Ok(());
    }

    let capture = Capture::open(
      &self.device_path,
      self.requested_width,
      self.requested_height,
    )?;
    info!(
      "摄像头输入源启动: {} ({}x{})",
      self.device_path, capture.width, capture.height
    );
    self.capture = Some(capture);
    Ok(())
  }

  fn stop(&mut self) {
    if self.capture.is_none() {
      return;
    }
    // Capture 的 Drop 保证 stream 先于 device 释放
    self.capture = None;
    self.slot = None;
    info!("摄像头输入源停止: {}", self.device_path);
  }

  fn is_running(&self) -> bool {
    self.capture.is_some()
  }

  fn latest_frame(&mut self) -> Option<&Frame> {
    let capture = self.capture.as_mut()?;
    let stream = capture.stream.as_mut()?;

    match stream.next() {
      Ok((buffer, _meta)) => {
        let rgb = Self::yuyv_to_rgb(buffer, capture.width, capture.height);
        let timestamp_ms = capture.started_at.elapsed().as_millis() as u64;
        self.seq += 1;
        self.slot = Some(Frame::new(
          capture.width,
          capture.height,
          self.seq,
          timestamp_ms,
          rgb,
        ));
        self.slot.as_ref()
      }
      Err(e) => {
        warn!("无法捕获帧: {}", e);
        None
      }
    }
  }
}
