// 该文件是 Hanjian （焊检） 项目的一部分。
// src/output/image_output.rs - 单文件图片输出
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
use tracing::info;

use super::{Inspection, OutputOptions, OutputWriter, side_by_side};
use crate::input::Frame;

/// 单文件图片输出
///
/// 有缺陷时写标注图（或前后对比图），无缺陷时原样写回输入帧。
pub struct ImageOutput {
  path: String,
  compare: bool,
}

impl ImageOutput {
  pub fn new(path: &str, options: OutputOptions) -> Self {
    ImageOutput {
      path: path.to_string(),
      compare: options.compare,
    }
  }
}

impl OutputWriter for ImageOutput {
  fn write_frame(&mut self, frame: &Frame, inspection: &Inspection) -> Result<()> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)
        .with_context(|| format!("无法创建输出目录: {}", parent.display()))?;
    }

    match &inspection.annotated {
      Some(annotated) if self.compare => {
        side_by_side(&frame.image, annotated)
          .save(&self.path)
          .with_context(|| format!("无法保存对比图: {}", self.path))?;
      }
      Some(annotated) => {
        annotated
          .save(&self.path)
          .with_context(|| format!("无法保存标注图: {}", self.path))?;
      }
      None => {
        frame
          .image
          .save(&self.path)
          .with_context(|| format!("无法保存图片: {}", self.path))?;
      }
    }

    info!("已保存: {}", self.path);
    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    Ok(())
  }
}
