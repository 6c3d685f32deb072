// 该文件是 Hanjian （焊检） 项目的一部分。
// src/detector/mod.rs - 检测器抽象与检测记录
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

mod remote;

pub use remote::{RemoteDetector, RemoteDetectorBuilder, RemoteDetectorError};

use image::RgbImage;

use crate::settings::Thresholds;

/// 单条检测记录
///
/// 坐标采用送检图像的像素坐标系，(x, y) 为边界框中心。
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  /// 类别标识，键入类别样式表
  pub class_id: String,
  /// 边界框中心 x 坐标
  pub x: f32,
  /// 边界框中心 y 坐标
  pub y: f32,
  /// 边界框宽度
  pub width: f32,
  /// 边界框高度
  pub height: f32,
  /// 检测置信度 (0.0 - 1.0)
  pub confidence: f32,
}

/// 检测器抽象
///
/// 空检测列表是合法的成功结果（"未发现缺陷"），与传输或服务错误严格区分。
pub trait Detector {
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, image: &RgbImage, thresholds: Thresholds)
  -> Result<Vec<Detection>, Self::Error>;
}
