// 该文件是 Hanjian （焊检） 项目的一部分。
// src/input/dir_source.rs - 图片目录输入源
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use image::ImageReader;
use tracing::{debug, warn};

use super::{Frame, InputSource, InputSourceType, is_image_path};

/// 图片目录输入源
///
/// 只取目录第一层的图片文件，按文件名字典序迭代，保证批量输出顺序稳定。
pub struct DirSource {
  files: Vec<PathBuf>,
  cursor: usize,
}

impl DirSource {
  pub fn open(path: &str) -> Result<Self> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path).with_context(|| format!("无法读取目录: {path}"))? {
      let entry = entry.with_context(|| format!("无法读取目录项: {path}"))?;
      let file_path = entry.path();
      if file_path.is_file() && is_image_path(&file_path.to_string_lossy()) {
        files.push(file_path);
      }
    }
    files.sort();

    if files.is_empty() {
      warn!("目录中没有可用的图片文件: {}", path);
    } else {
      debug!("目录 {} 含 {} 张图片", path, files.len());
    }

    Ok(DirSource { files, cursor: 0 })
  }
}

impl Iterator for DirSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let file_path = self.files.get(self.cursor)?.clone();
    let frame_index = self.cursor as u64;
    self.cursor += 1;

    let item = (|| -> Result<Frame> {
      let image = ImageReader::open(&file_path)
        .with_context(|| format!("无法打开图片文件: {}", file_path.display()))?
        .decode()
        .with_context(|| format!("无法解码图片文件: {}", file_path.display()))?
        .into_rgb8();

      Ok(Frame {
        image,
        index: frame_index,
        timestamp_ms: 0,
        name: file_path
          .file_name()
          .map(|name| name.to_string_lossy().into_owned()),
      })
    })();
    Some(item)
  }
}

impl InputSource for DirSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Directory
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};

  #[test]
  fn iterates_sorted_image_files() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["b.png", "a.png"] {
      RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]))
        .save(dir.path().join(name))
        .unwrap();
    }
    std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

    let source = DirSource::open(dir.path().to_str().unwrap()).unwrap();
    assert_eq!(source.source_type(), InputSourceType::Directory);

    let names: Vec<String> = source
      .map(|frame| frame.unwrap().name.unwrap())
      .collect();
    assert_eq!(names, vec!["a.png".to_string(), "b.png".to_string()]);
  }
}
