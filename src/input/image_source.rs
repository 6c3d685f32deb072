// 该文件是 Hanjian （焊检） 项目的一部分。
// src/input/image_source.rs - 单张图片输入源
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

use std::path::Path;

use anyhow::{Context, Result};
use image::ImageReader;

use super::{Frame, InputSource, InputSourceType};

/// 单张图片输入源，产出恰好一帧
pub struct ImageSource {
  frame: Option<Frame>,
}

impl ImageSource {
  pub fn open(path: &str) -> Result<Self> {
    let image = ImageReader::open(path)
      .with_context(|| format!("无法打开图片文件: {path}"))?
      .decode()
      .with_context(|| format!("无法解码图片文件: {path}"))?
      .into_rgb8();

    let name = Path::new(path)
      .file_name()
      .map(|name| name.to_string_lossy().into_owned());

    Ok(ImageSource {
      frame: Some(Frame {
        image,
        index: 0,
        timestamp_ms: 0,
        name,
      }),
    })
  }
}

impl Iterator for ImageSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take().map(Ok)
  }
}

impl InputSource for ImageSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Image
  }
}
