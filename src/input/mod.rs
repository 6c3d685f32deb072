// 该文件是 Hanjian （焊检） 项目的一部分。
// src/input/mod.rs - 输入源模块
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

#[cfg(feature = "read_image_file")]
mod dir_source;
#[cfg(feature = "gstreamer_input")]
mod gstreamer_input;
#[cfg(feature = "read_image_file")]
mod image_source;
#[cfg(feature = "v4l_input")]
mod v4l2_source;
#[cfg(feature = "zip_input")]
mod zip_source;

#[cfg(feature = "read_image_file")]
pub use dir_source::DirSource;
#[cfg(feature = "gstreamer_input")]
pub use gstreamer_input::GStreamerSource;
#[cfg(feature = "read_image_file")]
pub use image_source::ImageSource;
#[cfg(feature = "v4l_input")]
pub use v4l2_source::V4l2Source;
#[cfg(feature = "zip_input")]
pub use zip_source::ZipSource;

use anyhow::Result;
use image::RgbImage;

/// 帧数据
pub struct Frame {
  /// RGB 图像数据
  pub image: RgbImage,
  /// 帧索引
  pub index: u64,
  /// 相对输入源启动时刻的时间戳（毫秒）
  pub timestamp_ms: u64,
  /// 来源名称（文件名或压缩包条目名，实时来源为空）
  pub name: Option<String>,
}

/// 输入源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSourceType {
  /// 单张图片
  Image,
  /// 图片压缩包
  Archive,
  /// 图片目录
  Directory,
  /// 实时视频流（摄像头或管道）
  Live,
}

/// 输入源 trait
pub trait InputSource: Iterator<Item = Result<Frame>> {
  fn source_type(&self) -> InputSourceType;
}

/// 按扩展名判断是否是支持的图片文件
pub(crate) fn is_image_path(path: &str) -> bool {
  let lower = path.to_lowercase();
  lower.ends_with(".jpg")
    || lower.ends_with(".jpeg")
    || lower.ends_with(".png")
    || lower.ends_with(".bmp")
    || lower.ends_with(".gif")
    || lower.ends_with(".webp")
}

/// 从来源描述创建输入源
///
/// 支持:
/// - V4L2 摄像头: `/dev/video0` 或 `v4l2:///dev/video0?width=640&height=480`
/// - GStreamer 管道: `gst://camera/dev/video0` 或 `gst://file/path/to/video.mp4`
/// - 图片压缩包: `*.zip`
/// - 单张图片: `*.jpg`, `*.jpeg`, `*.png`, `*.bmp`, `*.gif`, `*.webp`
/// - 图片目录: 任何已存在的目录路径
pub fn create_input_source(source: &str) -> Result<Box<dyn InputSource>> {
  if source.starts_with("/dev/video") || source.starts_with("v4l2://") {
    #[cfg(feature = "v4l_input")]
    return Ok(Box::new(V4l2Source::open(source)?));
    #[cfg(not(feature = "v4l_input"))]
    anyhow::bail!("本构建未启用 v4l_input 特性，无法打开摄像头: {}", source);
  }

  if source.starts_with("gst://") {
    #[cfg(feature = "gstreamer_input")]
    return Ok(Box::new(GStreamerSource::open(source)?));
    #[cfg(not(feature = "gstreamer_input"))]
    anyhow::bail!("本构建未启用 gstreamer_input 特性，无法打开视频流: {}", source);
  }

  if source.to_lowercase().ends_with(".zip") {
    #[cfg(feature = "zip_input")]
    return Ok(Box::new(ZipSource::open(source)?));
    #[cfg(not(feature = "zip_input"))]
    anyhow::bail!("本构建未启用 zip_input 特性，无法读取压缩包: {}", source);
  }

  #[cfg(feature = "read_image_file")]
  {
    if is_image_path(source) {
      return Ok(Box::new(ImageSource::open(source)?));
    }
    if std::path::Path::new(source).is_dir() {
      return Ok(Box::new(DirSource::open(source)?));
    }
  }

  anyhow::bail!("不支持的输入来源: {}", source)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn image_path_detection() {
    assert!(is_image_path("weld.JPG"));
    assert!(is_image_path("samples/weld.png"));
    assert!(!is_image_path("weld.zip"));
    assert!(!is_image_path("weld.txt"));
  }

  #[test]
  fn unsupported_source_is_an_error() {
    assert!(create_input_source("no-such-thing.xyz").is_err());
  }
}
