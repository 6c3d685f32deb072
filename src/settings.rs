// 该文件是 Hanjian （焊检） 项目的一部分。
// src/settings.rs - 推理阈值配置
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

use std::sync::{Arc, RwLock};

use thiserror::Error;

pub const CONFIDENCE_DEFAULT: u8 = 10;
pub const OVERLAP_DEFAULT: u8 = 30;

#[derive(Error, Debug)]
pub enum ThresholdError {
  #[error("阈值超出 0-100 范围: {0}")]
  OutOfRange(u8),
}

/// 推理阈值，0-100 整数刻度
///
/// 两个阈值原样透传给检测服务，不在任何地方换算刻度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
  /// 置信度阈值：低于该置信度的检测被服务端丢弃
  pub confidence: u8,
  /// 重叠阈值：服务端非极大值抑制允许的最大框重叠
  pub overlap: u8,
}

impl Default for Thresholds {
  fn default() -> Self {
    Thresholds {
      confidence: CONFIDENCE_DEFAULT,
      overlap: OVERLAP_DEFAULT,
    }
  }
}

impl Thresholds {
  pub fn new(confidence: u8, overlap: u8) -> Result<Self, ThresholdError> {
    for value in [confidence, overlap] {
      if value > 100 {
        return Err(ThresholdError::OutOfRange(value));
      }
    }
    Ok(Thresholds {
      confidence,
      overlap,
    })
  }
}

/// 可在线程间共享更新的阈值句柄
///
/// 实时路径每帧读取一次当前值，控制路径可以随时写入新值，
/// 互不阻塞推理循环之外的任何东西。
#[derive(Debug, Clone, Default)]
pub struct SharedThresholds {
  inner: Arc<RwLock<Thresholds>>,
}

impl SharedThresholds {
  pub fn new(thresholds: Thresholds) -> Self {
    SharedThresholds {
      inner: Arc::new(RwLock::new(thresholds)),
    }
  }

  pub fn get(&self) -> Thresholds {
    *self.inner.read().unwrap()
  }

  pub fn set(&self, thresholds: Thresholds) {
    *self.inner.write().unwrap() = thresholds;
  }
}
