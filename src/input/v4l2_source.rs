// 该文件是 Hanjian （焊检） 项目的一部分。
// src/input/v4l2_source.rs - V4L2 摄像头输入源
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Hanjian 项目贡献者

use std::pin::Pin;
use std::time::Instant;

use anyhow::{Context as _, Result};
use image::RgbImage;
use tracing::info;
use url::Url;
use v4l::FourCC;
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;

use super::{Frame, InputSource, InputSourceType};

const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const CAPTURE_BUFFERS: u32 = 4;

/// V4L2 摄像头输入源
///
/// 来源描述形如 `/dev/video0` 或 `v4l2:///dev/video0?width=1280&height=720`。
/// 捕获格式协商为 YUYV，逐帧转换为 RGB。
///
/// v4l 库的 `Stream` 需要引用 `Device`；设备用 `Pin<Box>` 固定内存位置，
/// 使引用它的流可以与设备存放在同一个结构体里。
pub struct V4l2Source {
  /// V4L2 设备（固定内存位置，stream 依赖其地址稳定）
  device: Pin<Box<Device>>,
  /// 捕获流（生命周期与 device 绑定，必须先于 device 释放）
  stream: Option<Stream<'static>>,
  frame_index: u64,
  width: u32,
  height: u32,
  start_time: Instant,
}

/// 解析来源描述，返回设备路径与期望分辨率
fn parse_source(source: &str) -> Result<(String, u32, u32)> {
  if !source.starts_with("v4l2://") {
    return Ok((source.to_string(), DEFAULT_WIDTH, DEFAULT_HEIGHT));
  }

  let url = Url::parse(source).with_context(|| format!("无法解析摄像头地址: {source}"))?;
  let mut width = DEFAULT_WIDTH;
  let mut height = DEFAULT_HEIGHT;
  for (key, value) in url.query_pairs() {
    match key.as_ref() {
      "width" => width = value.parse().unwrap_or(DEFAULT_WIDTH),
      "height" => height = value.parse().unwrap_or(DEFAULT_HEIGHT),
      _ => {}
    }
  }
  Ok((url.path().to_string(), width, height))
}

impl V4l2Source {
  pub fn open(source: &str) -> Result<Self> {
    let (device_path, want_width, want_height) = parse_source(source)?;

    let device = Box::pin(
      Device::with_path(&device_path)
        .with_context(|| format!("无法打开摄像头设备: {device_path}"))?,
    );

    let mut format = device.format()?;
    format.width = want_width;
    format.height = want_height;
    format.fourcc = FourCC::new(b"YUYV");
    let format = device.set_format(&format)?;

    info!(
      "摄像头 {} 捕获格式: {}x{} {}",
      device_path, format.width, format.height, format.fourcc
    );

    let mut source = V4l2Source {
      device,
      stream: None,
      frame_index: 0,
      width: format.width,
      height: format.height,
      start_time: Instant::now(),
    };

    // SAFETY: device 被 Pin<Box> 固定在堆上，不会移动；stream 与 device
    // 存放在同一个结构体里，并在 Drop 中先于 device 释放，引用始终有效。
    let device_ref: &Device = &source.device;
    let stream = unsafe {
      let device_static: &'static Device = std::mem::transmute(device_ref);
      Stream::with_buffers(device_static, Type::VideoCapture, CAPTURE_BUFFERS)
        .context("无法创建捕获流")?
    };
    source.stream = Some(stream);

    Ok(source)
  }

  /// YUYV 转 RGB
  fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Vec<u8> {
    let mut rgb = Vec::with_capacity((width * height * 3) as usize);

    for chunk in yuyv.chunks_exact(4) {
      let y0 = chunk[0] as f32;
      let u = chunk[1] as f32 - 128.0;
      let y1 = chunk[2] as f32;
      let v = chunk[3] as f32 - 128.0;

      for y in [y0, y1] {
        let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
        let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
        let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;
        rgb.extend_from_slice(&[r, g, b]);
      }
    }

    rgb.truncate((width * height * 3) as usize);
    rgb
  }

  fn capture_frame(&mut self) -> Result<Frame> {
    let stream = self.stream.as_mut().context("捕获流未初始化")?;
    let (buffer, _meta) = stream.next().context("无法从摄像头读取帧")?;

    let rgb = Self::yuyv_to_rgb(buffer, self.width, self.height);
    let image = RgbImage::from_raw(self.width, self.height, rgb)
      .context("摄像头帧数据长度与分辨率不符")?;

    let frame = Frame {
      image,
      index: self.frame_index,
      timestamp_ms: self.start_time.elapsed().as_millis() as u64,
      name: None,
    };
    self.frame_index += 1;
    Ok(frame)
  }
}

impl Drop for V4l2Source {
  fn drop(&mut self) {
    // stream 必须先于 device 释放
    self.stream.take();
  }
}

impl Iterator for V4l2Source {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    Some(self.capture_frame())
  }
}

impl InputSource for V4l2Source {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Live
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn source_parsing() {
    let (device, width, height) = parse_source("/dev/video0").unwrap();
    assert_eq!(device, "/dev/video0");
    assert_eq!((width, height), (DEFAULT_WIDTH, DEFAULT_HEIGHT));

    let (device, width, height) =
      parse_source("v4l2:///dev/video2?width=1280&height=720").unwrap();
    assert_eq!(device, "/dev/video2");
    assert_eq!((width, height), (1280, 720));
  }

  #[test]
  fn yuyv_conversion_produces_three_channels() {
    // 两个像素的 YUYV 块，Y=128/64，UV 置中性值
    let yuyv = [128u8, 128, 64, 128];
    let rgb = V4l2Source::yuyv_to_rgb(&yuyv, 2, 1);
    assert_eq!(rgb.len(), 6);
    // 中性 UV 下三通道近似等于亮度
    assert!(rgb[0].abs_diff(128) <= 1);
    assert!(rgb[3].abs_diff(64) <= 1);
  }
}
