// 该文件是 Hanjian （焊检） 项目的一部分。
// src/annotate.rs - 检测结果标注渲染器
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

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use thiserror::Error;

use crate::classes::StyleTable;
use crate::detector::Detection;

// 渲染常量
const LABEL_FONT_SIZE: f32 = 25.0;
const BOX_STROKE: i32 = 3;
const LABEL_MARGIN: i32 = 10; // 每边 10 像素
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([30, 30, 30]);

#[derive(Error, Debug)]
pub enum AnnotateError {
  /// 类别标识不在样式表中，说明样式表与检测服务的类别枚举不一致
  #[error("未知缺陷类别: {class_id}")]
  UnknownClass { class_id: String },
  /// 宽高非正或非有限值的检测记录
  #[error("检测记录不合法（第 {index} 条）: 宽 {width}, 高 {height}")]
  MalformedDetection { index: usize, width: f32, height: f32 },
}

/// 检测结果标注渲染器
///
/// 纯函数式组件：输入图像从不被原地修改，输出是一张同尺寸的新图像，
/// 没有检测框或标签覆盖的位置保留原始像素。可以在多张图像上并发独立调用。
pub struct Annotator {
  font: FontArc,
  scale: PxScale,
}

impl Default for Annotator {
  fn default() -> Self {
    Self::new()
  }
}

impl Annotator {
  pub fn new() -> Self {
    let font_data = include_bytes!("../assets/DejaVuSans.ttf");
    let font = FontArc::try_from_slice(font_data).expect("无法加载内嵌字体");

    Annotator {
      font,
      scale: PxScale::from(LABEL_FONT_SIZE),
    }
  }

  /// 在输入图像的副本上，按输入顺序绘制全部检测框与标签
  ///
  /// 顺序即层叠顺序：后面的检测画在前面的之上（重叠处后者覆盖前者）。
  /// 坐标不做任何截断，越界的框和标签由栅格表面自然裁剪，
  /// 上游检测服务给出的坐标在这里被完全信任。
  ///
  /// 任一检测记录非法或类别未知时整个调用失败，不产生输出图像。
  pub fn annotate(
    &self,
    image: &RgbImage,
    detections: &[Detection],
    styles: &StyleTable,
  ) -> Result<RgbImage, AnnotateError> {
    let mut canvas = image.clone();

    for (index, detection) in detections.iter().enumerate() {
      if !Self::well_formed(detection) {
        return Err(AnnotateError::MalformedDetection {
          index,
          width: detection.width,
          height: detection.height,
        });
      }

      let style = styles
        .get(&detection.class_id)
        .ok_or_else(|| AnnotateError::UnknownClass {
          class_id: detection.class_id.clone(),
        })?;

      // 中心+尺寸 转 角点
      let x1 = detection.x - detection.width / 2.0;
      let y1 = detection.y - detection.height / 2.0;
      let x2 = detection.x + detection.width / 2.0;
      let y2 = detection.y + detection.height / 2.0;

      self.draw_outline(&mut canvas, x1, y1, x2, y2, style.color);
      self.draw_label(&mut canvas, x1, y1, styles.label(style), style.color);
    }

    Ok(canvas)
  }

  fn well_formed(detection: &Detection) -> bool {
    detection.width > 0.0
      && detection.height > 0.0
      && detection.width.is_finite()
      && detection.height.is_finite()
      && detection.x.is_finite()
      && detection.y.is_finite()
  }

  /// 边框：从外角向内收缩的 3 条 1 像素空心矩形
  fn draw_outline(&self, canvas: &mut RgbImage, x1: f32, y1: f32, x2: f32, y2: f32, color: Rgb<u8>) {
    let left = x1.round() as i32;
    let top = y1.round() as i32;
    let right = x2.round() as i32;
    let bottom = y2.round() as i32;

    for inset in 0..BOX_STROKE {
      let width = right - left + 1 - 2 * inset;
      let height = bottom - top + 1 - 2 * inset;
      if width < 1 || height < 1 {
        break;
      }

      let rect = Rect::at(left + inset, top + inset).of_size(width as u32, height as u32);
      draw_hollow_rect_mut(canvas, rect, color);
    }
  }

  /// 标签块：文本外扩每边 10 像素的底色块，底边左角锚定在框左上角 (x1, y1)
  fn draw_label(&self, canvas: &mut RgbImage, x1: f32, y1: f32, text: &str, color: Rgb<u8>) {
    let (text_width, text_height) = text_size(self.scale, &self.font, text);
    let block_width = text_width as i32 + 2 * LABEL_MARGIN;
    let block_height = text_height as i32 + 2 * LABEL_MARGIN;

    // 与上游坐标一致：向零截断
    let block_x = x1 as i32;
    let block_y = y1 as i32 - block_height;

    let rect = Rect::at(block_x, block_y).of_size(block_width as u32, block_height as u32);
    draw_filled_rect_mut(canvas, rect, color);

    draw_text_mut(
      canvas,
      LABEL_TEXT_COLOR,
      block_x + LABEL_MARGIN,
      block_y + LABEL_MARGIN,
      self.scale,
      &self.font,
      text,
    );
  }

  /// 当前字号下某条标签文本的块尺寸（含边距）
  pub fn label_block_size(&self, text: &str) -> (u32, u32) {
    let (text_width, text_height) = text_size(self.scale, &self.font, text);
    (
      text_width + 2 * LABEL_MARGIN as u32,
      text_height + 2 * LABEL_MARGIN as u32,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::classes::LabelLanguage;

  fn detection(class_id: &str, x: f32, y: f32, width: f32, height: f32) -> Detection {
    Detection {
      class_id: class_id.to_string(),
      x,
      y,
      width,
      height,
      confidence: 0.9,
    }
  }

  fn gray_image(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([120, 120, 120]))
  }

  #[test]
  fn output_keeps_dimensions() {
    let annotator = Annotator::new();
    let image = gray_image(320, 240);
    let out = annotator
      .annotate(
        &image,
        &[detection("0", 100.0, 100.0, 40.0, 30.0)],
        &StyleTable::default(),
      )
      .unwrap();
    assert_eq!(out.dimensions(), (320, 240));
  }

  #[test]
  fn empty_detections_is_identity() {
    let annotator = Annotator::new();
    let image = gray_image(64, 48);
    let out = annotator
      .annotate(&image, &[], &StyleTable::default())
      .unwrap();
    assert_eq!(out.as_raw(), image.as_raw());
  }

  #[test]
  fn input_image_is_not_mutated() {
    let annotator = Annotator::new();
    let image = gray_image(200, 200);
    let before = image.clone();
    let _ = annotator
      .annotate(
        &image,
        &[detection("1", 100.0, 100.0, 60.0, 60.0)],
        &StyleTable::default(),
      )
      .unwrap();
    assert_eq!(image.as_raw(), before.as_raw());
  }

  #[test]
  fn pixels_outside_box_and_label_are_unchanged() {
    let annotator = Annotator::new();
    let styles = StyleTable::default();
    let image = gray_image(400, 400);
    let det = detection("2", 200.0, 250.0, 60.0, 40.0);
    let out = annotator.annotate(&image, &[det], &styles).unwrap();

    // 框区域 [170, 230] x [230, 270]
    let (block_w, block_h) = annotator.label_block_size("Broken-arc");
    let (bx, by) = (170i32, 230 - block_h as i32);

    let mut changed = 0usize;
    for y in 0..400i32 {
      for x in 0..400i32 {
        let in_box = (170..=230).contains(&x) && (230..=270).contains(&y);
        let in_label =
          (bx..bx + block_w as i32).contains(&x) && (by..by + block_h as i32).contains(&y);
        let a = image.get_pixel(x as u32, y as u32);
        let b = out.get_pixel(x as u32, y as u32);
        if !in_box && !in_label {
          assert_eq!(a, b, "区域外像素被改写: ({x}, {y})");
        } else if a != b {
          changed += 1;
        }
      }
    }
    assert!(changed > 0);
  }

  #[test]
  fn annotate_is_deterministic() {
    let annotator = Annotator::new();
    let styles = StyleTable::default();
    let image = gray_image(128, 128);
    let detections = vec![
      detection("0", 40.0, 40.0, 30.0, 20.0),
      detection("7", 90.0, 90.0, 30.0, 20.0),
    ];
    let a = annotator.annotate(&image, &detections, &styles).unwrap();
    let b = annotator.annotate(&image, &detections, &styles).unwrap();
    assert_eq!(a.as_raw(), b.as_raw());
  }

  #[test]
  fn later_detection_wins_in_overlap() {
    let annotator = Annotator::new();
    let styles = StyleTable::default();
    let image = gray_image(200, 200);
    // 同一个框先画类别 0（红），再画类别 3（黄）：边框像素以后者为准
    let first = detection("0", 100.0, 120.0, 50.0, 50.0);
    let second = detection("3", 100.0, 120.0, 50.0, 50.0);
    let out = annotator
      .annotate(&image, &[first, second], &styles)
      .unwrap();
    assert_eq!(*out.get_pixel(75, 120), Rgb([0xFF, 0xEF, 0x00]));
  }

  #[test]
  fn unknown_class_fails_whole_call() {
    let annotator = Annotator::new();
    let image = gray_image(100, 100);
    let result = annotator.annotate(
      &image,
      &[detection("42", 50.0, 50.0, 10.0, 10.0)],
      &StyleTable::default(),
    );
    match result {
      Err(AnnotateError::UnknownClass { class_id }) => assert_eq!(class_id, "42"),
      other => panic!("期望 UnknownClass，得到 {other:?}"),
    }
  }

  #[test]
  fn malformed_detection_is_rejected() {
    let annotator = Annotator::new();
    let image = gray_image(100, 100);
    for bad in [
      detection("0", 50.0, 50.0, 0.0, 10.0),
      detection("0", 50.0, 50.0, 10.0, -3.0),
      detection("0", 50.0, 50.0, f32::NAN, 10.0),
    ] {
      let result = annotator.annotate(&image, &[bad], &StyleTable::default());
      assert!(matches!(
        result,
        Err(AnnotateError::MalformedDetection { .. })
      ));
    }
  }

  /// 规约场景：100x100 图像，类别 "3" (#FFEF00, "Crack")，中心 (50,50)，尺寸 20x10
  #[test]
  fn crack_scenario_geometry() {
    let annotator = Annotator::new();
    let styles = StyleTable::new(LabelLanguage::English);
    let image = gray_image(100, 100);
    let out = annotator
      .annotate(&image, &[detection("3", 50.0, 50.0, 20.0, 10.0)], &styles)
      .unwrap();

    let yellow = Rgb([0xFF, 0xEF, 0x00]);

    // 边框角点 (40,45) - (60,55)，线宽 3
    assert_eq!(*out.get_pixel(40, 45), yellow);
    assert_eq!(*out.get_pixel(60, 55), yellow);
    assert_eq!(*out.get_pixel(41, 46), yellow);
    assert_eq!(*out.get_pixel(42, 47), yellow);
    // 线宽之内没有填充
    assert_eq!(*out.get_pixel(50, 51), Rgb([120, 120, 120]));

    // 标签块底边左角锚定在 (40, 45)，向上延伸
    let (block_w, block_h) = annotator.label_block_size("Crack");
    let block_top = 45 - block_h as i32;
    let block_right = (40 + block_w - 1).min(99); // 右侧越界部分被裁剪
    assert_eq!(*out.get_pixel(40, 44), yellow);
    assert_eq!(*out.get_pixel(block_right, 44), yellow);
    if block_top >= 0 {
      assert_eq!(*out.get_pixel(40, block_top as u32), yellow);
    } else {
      // 块顶越出上边缘时被裁剪，首行仍是底色
      assert_eq!(*out.get_pixel(40, 0), yellow);
    }
  }

  /// 越界的框照画不误，由栅格表面裁剪
  #[test]
  fn out_of_bounds_box_is_clipped_not_clamped() {
    let annotator = Annotator::new();
    let image = gray_image(100, 100);
    let out = annotator
      .annotate(
        &image,
        &[detection("5", 0.0, 0.0, 40.0, 40.0)],
        &StyleTable::default(),
      )
      .unwrap();
    assert_eq!(out.dimensions(), (100, 100));
    // 框的可见部分（右下象限）落在图内
    assert_eq!(*out.get_pixel(20, 0), Rgb([0xED, 0x1B, 0x24]));
    assert_eq!(*out.get_pixel(0, 20), Rgb([0xED, 0x1B, 0x24]));
  }
}
