// 该文件是 Hanjian （焊检） 项目的一部分。
// src/output/mod.rs - 输出模块
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

#[cfg(feature = "save_image_file")]
mod compare;
#[cfg(feature = "directory_record")]
mod directory_output;
#[cfg(feature = "save_image_file")]
mod image_output;

#[cfg(feature = "save_image_file")]
pub use compare::side_by_side;
#[cfg(feature = "directory_record")]
pub use directory_output::DirectoryOutput;
#[cfg(feature = "save_image_file")]
pub use image_output::ImageOutput;

use anyhow::Result;
use image::RgbImage;

use crate::classes::StyleTable;
use crate::detector::Detection;
use crate::input::Frame;

/// 一帧的检验结果
///
/// `annotated` 与检测列表同生同灭：没有检测就没有标注图像。
pub struct Inspection {
  pub detections: Vec<Detection>,
  pub annotated: Option<RgbImage>,
}

impl Inspection {
  pub fn defects_found(&self) -> bool {
    !self.detections.is_empty()
  }
}

/// 输出选项
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputOptions {
  /// 输出前后对比图而不是单独的标注图
  pub compare: bool,
  /// 同时输出检测记录文本
  pub record: bool,
  /// 无缺陷的帧也保存
  pub always: bool,
  /// 记录文本使用的标签表
  pub styles: StyleTable,
}

/// 输出写入器 trait
pub trait OutputWriter {
  /// 写入一帧的检验结果
  fn write_frame(&mut self, frame: &Frame, inspection: &Inspection) -> Result<()>;

  /// 完成写入
  fn finish(&mut self) -> Result<()>;
}

/// 按输出路径创建输出写入器
///
/// 图片扩展名走单文件输出，其余路径按目录输出处理。
pub fn create_output_writer(path: &str, options: OutputOptions) -> Result<Box<dyn OutputWriter>> {
  if crate::input::is_image_path(path) {
    #[cfg(feature = "save_image_file")]
    return Ok(Box::new(ImageOutput::new(path, options)));
    #[cfg(not(feature = "save_image_file"))]
    anyhow::bail!("本构建未启用 save_image_file 特性，无法输出图片文件: {}", path);
  }

  #[cfg(feature = "directory_record")]
  return Ok(Box::new(DirectoryOutput::new(path, options)));
  #[cfg(not(feature = "directory_record"))]
  anyhow::bail!("本构建未启用 directory_record 特性，无法输出到目录: {}", path);
}
