// 该文件是 Hanjian （焊检） 项目的一部分。
// src/input/gstreamer_input.rs - GStreamer 视频输入源
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

//! 基于 GStreamer 的视频输入，支持摄像头与视频文件：
//!
//! - `gst://camera/dev/video0?width=640&height=480&fps=15`
//! - `gst://file/path/to/video.mp4`
//!
//! 需要系统安装 GStreamer 开发库（Ubuntu/Debian:
//! `libgstreamer1.0-dev libgstreamer-plugins-base1.0-dev`），
//! 并启用 `gstreamer_input` 特性。

use std::collections::HashMap;
use std::time::Instant;

use gstreamer::{self as gst, prelude::*};
use gstreamer_app as gst_app;
use gstreamer_video as gst_video;
use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use super::{Frame, InputSource, InputSourceType};

const GSTREAMER_SCHEME: &str = "gst";
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;
const DEFAULT_FPS: u32 = 15;

#[derive(Error, Debug)]
pub enum GStreamerSourceError {
  #[error("来源地址不合法: {0}")]
  BadSource(String),
  #[error("GStreamer 错误: {0}")]
  GStreamer(#[from] gst::glib::Error),
  #[error("GStreamer 操作失败: {0}")]
  Bool(#[from] gst::glib::BoolError),
  #[error("管道状态切换失败: {0}")]
  StateChange(#[from] gst::StateChangeError),
  #[error("管道缺少 appsink 元素")]
  AppSinkNotFound,
  #[error("无法从 caps 读取视频信息")]
  VideoInfo,
  #[error("不支持的视频格式: {0}")]
  UnsupportedFormat(String),
  #[error("管道错误: {0}")]
  Pipeline(String),
}

/// GStreamer 视频输入源
///
/// 管道尾部挂一个丢帧的 appsink（max-buffers=2 drop=true），
/// 推理跟不上帧率时丢旧帧而不是积压。
pub struct GStreamerSource {
  pipeline: gst::Pipeline,
  appsink: gst_app::AppSink,
  frame_index: u64,
  start_time: Instant,
}

/// 从 `gst://` 地址构建管道描述
fn pipeline_description(url: &Url) -> Result<String, GStreamerSourceError> {
  let query: HashMap<String, String> = url
    .query_pairs()
    .map(|(key, value)| (String::from(key), String::from(value)))
    .collect();

  let head = match url.host_str() {
    Some("camera") => {
      let width = query
        .get("width")
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_WIDTH);
      let height = query
        .get("height")
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_HEIGHT);
      let fps = query
        .get("fps")
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_FPS);
      format!(
        "v4l2src device={} ! video/x-raw,width={},height={},framerate={}/1",
        url.path(),
        width,
        height,
        fps
      )
    }
    Some("file") => format!("filesrc location={} ! decodebin", url.path()),
    _ => return Err(GStreamerSourceError::BadSource(url.to_string())),
  };

  Ok(format!(
    "{} ! videoconvert ! video/x-raw,format=RGB ! appsink max-buffers=2 drop=true name=sink",
    head
  ))
}

impl GStreamerSource {
  pub fn open(source: &str) -> Result<Self, GStreamerSourceError> {
    let url =
      Url::parse(source).map_err(|_| GStreamerSourceError::BadSource(source.to_string()))?;
    if url.scheme() != GSTREAMER_SCHEME {
      return Err(GStreamerSourceError::BadSource(source.to_string()));
    }

    gst::init()?;

    let description = pipeline_description(&url)?;
    info!("GStreamer 管道: {}", description);

    let pipeline = gst::parse::launch(&description)?
      .downcast::<gst::Pipeline>()
      .map_err(|_| GStreamerSourceError::Pipeline(String::from("无法构建管道")))?;

    let appsink = pipeline
      .by_name("sink")
      .ok_or(GStreamerSourceError::AppSinkNotFound)?
      .downcast::<gst_app::AppSink>()
      .map_err(|_| GStreamerSourceError::AppSinkNotFound)?;

    pipeline.set_state(gst::State::Playing)?;

    Ok(GStreamerSource {
      pipeline,
      appsink,
      frame_index: 0,
      start_time: Instant::now(),
    })
  }

  /// 把一个 RGB 采样拷贝成 `RgbImage`，逐行跳过 stride 对齐填充
  fn sample_to_image(sample: &gst::Sample) -> Result<RgbImage, GStreamerSourceError> {
    let buffer = sample
      .buffer()
      .ok_or_else(|| GStreamerSourceError::Pipeline(String::from("采样缺少缓冲区")))?;
    let caps = sample
      .caps()
      .ok_or_else(|| GStreamerSourceError::Pipeline(String::from("采样缺少 caps")))?;
    let video_info =
      gst_video::VideoInfo::from_caps(caps).map_err(|_| GStreamerSourceError::VideoInfo)?;

    if video_info.format() != gst_video::VideoFormat::Rgb {
      return Err(GStreamerSourceError::UnsupportedFormat(format!(
        "{:?}",
        video_info.format()
      )));
    }

    let width = video_info.width();
    let height = video_info.height();
    let stride = video_info.stride()[0] as usize;
    let row_bytes = width as usize * 3;

    let map = buffer
      .map_readable()
      .map_err(|_| GStreamerSourceError::Pipeline(String::from("无法映射缓冲区")))?;
    let data = map.as_slice();

    if data.len() < stride * (height as usize - 1) + row_bytes {
      return Err(GStreamerSourceError::Pipeline(format!(
        "缓冲区长度不足: {} 字节, 期望至少 {} 字节",
        data.len(),
        stride * (height as usize - 1) + row_bytes
      )));
    }

    let mut rgb = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
      let offset = row * stride;
      rgb.extend_from_slice(&data[offset..offset + row_bytes]);
    }

    RgbImage::from_raw(width, height, rgb)
      .ok_or_else(|| GStreamerSourceError::Pipeline(String::from("帧数据长度与分辨率不符")))
  }
}

impl Drop for GStreamerSource {
  fn drop(&mut self) {
    if let Err(error) = self.pipeline.set_state(gst::State::Null) {
      tracing::warn!("停止 GStreamer 管道失败: {}", error);
    }
  }
}

impl Iterator for GStreamerSource {
  type Item = anyhow::Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    // EOS 或管道停止时 pull_sample 返回错误，迭代随之结束
    let sample = self.appsink.pull_sample().ok()?;

    let item = Self::sample_to_image(&sample)
      .map(|image| {
        let frame = Frame {
          image,
          index: self.frame_index,
          timestamp_ms: self.start_time.elapsed().as_millis() as u64,
          name: None,
        };
        self.frame_index += 1;
        frame
      })
      .map_err(anyhow::Error::from);
    Some(item)
  }
}

impl InputSource for GStreamerSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Live
  }
}
