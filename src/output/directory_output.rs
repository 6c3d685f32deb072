// 该文件是 Hanjian （焊检） 项目的一部分。
// src/output/directory_output.rs - 目录输出
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

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Utc};
use tracing::{debug, info};

use super::{Inspection, OutputOptions, OutputWriter};
use crate::classes::StyleTable;
use crate::input::Frame;

/// 目录输出
///
/// 具名帧（文件或压缩包条目）按 `<原名主干>_annotated.png` 命名，
/// 实时帧按 `年/月/日/时-分-秒-序号.png` 归档。默认只保存有缺陷的帧，
/// `always` 选项把无缺陷的帧也原样存档。
pub struct DirectoryOutput {
  directory: PathBuf,
  record: bool,
  always: bool,
  styles: StyleTable,
  counter: u32,
  saved: u64,
}

impl DirectoryOutput {
  pub fn new(path: &str, options: OutputOptions) -> Self {
    DirectoryOutput {
      directory: PathBuf::from(path),
      record: options.record,
      always: options.always,
      styles: options.styles,
      counter: 0,
      saved: 0,
    }
  }

  fn frame_path(&mut self, frame: &Frame) -> Result<PathBuf> {
    if let Some(name) = &frame.name {
      let stem = Path::new(name)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("frame-{}", frame.index));

      std::fs::create_dir_all(&self.directory)
        .with_context(|| format!("无法创建输出目录: {}", self.directory.display()))?;

      // 压缩包里可能有同名不同目录的条目，碰撞时追加序号
      let mut path = self.directory.join(format!("{stem}_annotated.png"));
      let mut duplicate = 0u32;
      while path.exists() {
        duplicate += 1;
        path = self
          .directory
          .join(format!("{stem}_annotated_{duplicate}.png"));
      }
      return Ok(path);
    }

    let now = Utc::now();
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)
      .with_context(|| format!("无法创建输出目录: {}", directory.display()))?;

    self.counter += 1;
    Ok(directory.join(format!("{}-{:04X}.png", now.format("%H-%M-%S"), self.counter)))
  }

  fn write_record(&self, image_path: &Path, inspection: &Inspection) -> Result<()> {
    let mut lines = Vec::with_capacity(inspection.detections.len());
    for detection in &inspection.detections {
      let label = self
        .styles
        .get(&detection.class_id)
        .map(|style| self.styles.label(style))
        .unwrap_or(detection.class_id.as_str());
      lines.push(format!(
        "{}, {:.4}, {:.1}, {:.1}, {:.1}, {:.1}",
        label, detection.confidence, detection.x, detection.y, detection.width, detection.height
      ));
    }

    let record_path = image_path.with_extension("txt");
    std::fs::write(&record_path, lines.join("\n"))
      .with_context(|| format!("无法写入检测记录: {}", record_path.display()))?;
    debug!("检测记录: {}", record_path.display());
    Ok(())
  }
}

impl OutputWriter for DirectoryOutput {
  fn write_frame(&mut self, frame: &Frame, inspection: &Inspection) -> Result<()> {
    if !inspection.defects_found() && !self.always {
      return Ok(());
    }

    let path = self.frame_path(frame)?;
    let image = inspection.annotated.as_ref().unwrap_or(&frame.image);
    image
      .save(&path)
      .with_context(|| format!("无法保存图片: {}", path.display()))?;
    self.saved += 1;
    debug!("已保存: {}", path.display());

    if self.record && inspection.defects_found() {
      self.write_record(&path, inspection)?;
    }

    Ok(())
  }

  fn finish(&mut self) -> Result<()> {
    info!(
      "输出目录 {} 共保存 {} 张图片",
      self.directory.display(),
      self.saved
    );
    Ok(())
  }
}
