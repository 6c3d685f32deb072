// 该文件是 Hanjian （焊检） 项目的一部分。
// src/output/compare.rs - 前后对比图合成
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

use image::{Rgb, RgbImage, imageops};

const DIVIDER_WIDTH: u32 = 3;
const DIVIDER_COLOR: Rgb<u8> = Rgb([192, 192, 192]);

/// 左原图、右标注图的并排对比图，中间隔一条分割线
pub fn side_by_side(original: &RgbImage, annotated: &RgbImage) -> RgbImage {
  let width = original.width() + DIVIDER_WIDTH + annotated.width();
  let height = original.height().max(annotated.height());

  let mut canvas = RgbImage::from_pixel(width, height, DIVIDER_COLOR);
  imageops::replace(&mut canvas, original, 0, 0);
  imageops::replace(
    &mut canvas,
    annotated,
    (original.width() + DIVIDER_WIDTH) as i64,
    0,
  );
  canvas
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn layout_and_divider() {
    let original = RgbImage::from_pixel(10, 8, Rgb([1, 1, 1]));
    let annotated = RgbImage::from_pixel(10, 8, Rgb([2, 2, 2]));

    let composite = side_by_side(&original, &annotated);
    assert_eq!(composite.dimensions(), (23, 8));
    assert_eq!(*composite.get_pixel(0, 0), Rgb([1, 1, 1]));
    assert_eq!(*composite.get_pixel(9, 7), Rgb([1, 1, 1]));
    assert_eq!(*composite.get_pixel(11, 4), DIVIDER_COLOR);
    assert_eq!(*composite.get_pixel(13, 0), Rgb([2, 2, 2]));
    assert_eq!(*composite.get_pixel(22, 7), Rgb([2, 2, 2]));
  }
}
