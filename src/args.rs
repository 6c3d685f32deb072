// 该文件是 Hanjian （焊检） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use clap::{Parser, ValueEnum};

use hanjian::classes::LabelLanguage;
use hanjian::settings::{CONFIDENCE_DEFAULT, OVERLAP_DEFAULT};

/// 标签语言选项
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LabelArg {
  /// 英文标签
  En,
  /// 俄文标签
  Ru,
}

impl From<LabelArg> for LabelLanguage {
  fn from(arg: LabelArg) -> Self {
    match arg {
      LabelArg::En => LabelLanguage::English,
      LabelArg::Ru => LabelLanguage::Russian,
    }
  }
}

/// Hanjian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入来源
  /// 支持:
  /// - 图片: *.jpg, *.jpeg, *.png, *.bmp, *.gif, *.webp
  /// - 图片压缩包: *.zip
  /// - 图片目录: 目录路径
  /// - 摄像头: /dev/video0 或 v4l2:///dev/video0
  /// - GStreamer: gst://camera/dev/video0 或 gst://file/video.mp4
  #[arg(long, value_name = "SOURCE")]
  pub input: String,

  /// 输出路径
  /// 图片扩展名写单文件，其余路径按目录输出
  #[arg(long, value_name = "OUTPUT", default_value = "inspected")]
  pub output: String,

  /// 推理服务 API 密钥
  #[arg(long, value_name = "KEY")]
  pub api_key: String,

  /// 推理服务地址
  #[arg(long, value_name = "URL", default_value = "https://detect.roboflow.com")]
  pub endpoint: String,

  /// 推理模型标识
  #[arg(long, value_name = "MODEL", default_value = "welding-defects-detection-wtxow")]
  pub model: String,

  /// 推理模型版本
  #[arg(long, value_name = "VERSION", default_value = "1")]
  pub model_version: String,

  /// 置信度阈值 (0 - 100)
  #[arg(
    long,
    default_value_t = CONFIDENCE_DEFAULT,
    value_name = "THRESHOLD",
    value_parser = clap::value_parser!(u8).range(0..=100)
  )]
  pub confidence: u8,

  /// 重叠阈值 (0 - 100)
  #[arg(
    long,
    default_value_t = OVERLAP_DEFAULT,
    value_name = "THRESHOLD",
    value_parser = clap::value_parser!(u8).range(0..=100)
  )]
  pub overlap: u8,

  /// 标签语言
  #[arg(long, value_enum, default_value = "en", value_name = "LANG")]
  pub labels: LabelArg,

  /// 输出前后对比图（仅单文件输出有效）
  #[arg(long)]
  pub compare: bool,

  /// 同时输出检测记录文本（仅目录输出有效）
  #[arg(long)]
  pub record: bool,

  /// 无缺陷的帧也保存（仅目录输出有效）
  #[arg(long)]
  pub save_clean: bool,

  /// 最大处理帧数，0 表示无限制（仅实时来源有效）
  #[arg(long, default_value_t = 0, value_name = "COUNT")]
  pub max_frames: u64,

  /// 推理请求超时（秒）
  #[arg(long, default_value_t = 30, value_name = "SECONDS")]
  pub timeout: u64,
}
