// 该文件是 Hanjian （焊检） 项目的一部分。
// src/input/zip_source.rs - 图片压缩包输入源
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

use std::fs::File;
use std::io::{BufReader, Read};

use anyhow::{Context, Result};
use tracing::{debug, warn};
use zip::ZipArchive;

use super::{Frame, InputSource, InputSourceType, is_image_path};

/// 图片压缩包输入源
///
/// 条目按归档顺序迭代，整个压缩包不落盘解压，逐条在内存中解码。
/// 非图片条目与 macOS 打包产生的 `__MACOSX/` 垃圾条目被跳过。
/// 单个条目解码失败产出一条错误而不中断后续条目。
pub struct ZipSource {
  archive: ZipArchive<BufReader<File>>,
  entries: Vec<(usize, String)>,
  cursor: usize,
}

impl ZipSource {
  pub fn open(path: &str) -> Result<Self> {
    let file = File::open(path).with_context(|| format!("无法打开压缩包: {path}"))?;
    let mut archive =
      ZipArchive::new(BufReader::new(file)).with_context(|| format!("无法读取压缩包: {path}"))?;

    let mut entries = Vec::new();
    for entry_index in 0..archive.len() {
      let entry = archive
        .by_index(entry_index)
        .with_context(|| format!("无法读取压缩包条目 {entry_index}"))?;
      if entry.is_dir() {
        continue;
      }

      let name = entry.name().to_string();
      if name.starts_with("__MACOSX/") || !is_image_path(&name) {
        debug!("跳过压缩包条目: {}", name);
        continue;
      }
      entries.push((entry_index, name));
    }

    if entries.is_empty() {
      warn!("压缩包中没有可用的图片条目: {}", path);
    } else {
      debug!("压缩包 {} 含 {} 张图片", path, entries.len());
    }

    Ok(ZipSource {
      archive,
      entries,
      cursor: 0,
    })
  }

  fn decode_entry(&mut self, entry_index: usize, name: &str) -> Result<image::RgbImage> {
    let mut entry = self
      .archive
      .by_index(entry_index)
      .with_context(|| format!("无法读取压缩包条目: {name}"))?;

    let mut buffer = Vec::with_capacity(entry.size() as usize);
    entry
      .read_to_end(&mut buffer)
      .with_context(|| format!("无法读取压缩包条目: {name}"))?;

    let image = image::load_from_memory(&buffer)
      .with_context(|| format!("无法解码压缩包条目: {name}"))?
      .into_rgb8();
    Ok(image)
  }
}

impl Iterator for ZipSource {
  type Item = Result<Frame>;

  fn next(&mut self) -> Option<Self::Item> {
    let (entry_index, name) = self.entries.get(self.cursor)?.clone();
    let frame_index = self.cursor as u64;
    self.cursor += 1;

    let item = self.decode_entry(entry_index, &name).map(|image| Frame {
      image,
      index: frame_index,
      timestamp_ms: 0,
      name: Some(name),
    });
    Some(item)
  }
}

impl InputSource for ZipSource {
  fn source_type(&self) -> InputSourceType {
    InputSourceType::Archive
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};
  use std::io::Write;
  use zip::write::{SimpleFileOptions, ZipWriter};

  fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_pixel(width, height, Rgb([10, 20, 30]));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
      .write_to(&mut buffer, image::ImageFormat::Png)
      .unwrap();
    buffer.into_inner()
  }

  fn sample_archive(path: &std::path::Path) {
    let file = File::create(path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    writer.start_file("welds/a.png", options).unwrap();
    writer.write_all(&png_bytes(8, 6)).unwrap();

    writer.start_file("welds/notes.txt", options).unwrap();
    writer.write_all(b"not an image").unwrap();

    writer.start_file("__MACOSX/welds/._a.png", options).unwrap();
    writer.write_all(b"resource fork junk").unwrap();

    writer.start_file("b.jpg", options).unwrap();
    writer.write_all(&png_bytes(4, 4)).unwrap();

    writer.finish().unwrap();
  }

  #[test]
  fn iterates_image_entries_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("welds.zip");
    sample_archive(&path);

    let source = ZipSource::open(path.to_str().unwrap()).unwrap();
    assert_eq!(source.source_type(), InputSourceType::Archive);

    let names: Vec<String> = source
      .map(|frame| frame.unwrap().name.unwrap())
      .collect();
    assert_eq!(names, vec!["welds/a.png".to_string(), "b.jpg".to_string()]);
  }

  #[test]
  fn bad_entry_does_not_stop_iteration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.zip");

    let file = File::create(&path).unwrap();
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    writer.start_file("broken.png", options).unwrap();
    writer.write_all(b"definitely not a png").unwrap();
    writer.start_file("good.png", options).unwrap();
    writer.write_all(&png_bytes(5, 5)).unwrap();
    writer.finish().unwrap();

    let mut source = ZipSource::open(path.to_str().unwrap()).unwrap();
    assert!(source.next().unwrap().is_err());
    let frame = source.next().unwrap().unwrap();
    assert_eq!(frame.image.dimensions(), (5, 5));
    assert!(source.next().is_none());
  }
}
