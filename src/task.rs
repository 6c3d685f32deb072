// 该文件是 Hanjian （焊检） 项目的一部分。
// src/task.rs - 检验任务运行器
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

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use thiserror::Error;
use tracing::{info, warn};

use crate::annotate::{AnnotateError, Annotator};
use crate::classes::StyleTable;
use crate::detector::Detector;
use crate::input::{Frame, InputSource};
use crate::output::{Inspection, OutputWriter};
use crate::settings::SharedThresholds;

const BATCH_DIVIDER: &str = "----------------------------------------";
const FORCE_EXIT_GRACE: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum InspectError<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  #[error("检测服务调用失败: {0}")]
  Detector(#[source] E),
  #[error("标注渲染失败: {0}")]
  Annotate(#[from] AnnotateError),
}

/// 单帧检验单元：读阈值 → 调检测服务 → 有检测时渲染标注
///
/// 阈值每次都从共享句柄读取，实时路径的控制端改了阈值，下一帧立即生效。
pub struct Inspector<D> {
  detector: D,
  annotator: Annotator,
  styles: StyleTable,
  thresholds: SharedThresholds,
}

impl<D: Detector> Inspector<D> {
  pub fn new(
    detector: D,
    annotator: Annotator,
    styles: StyleTable,
    thresholds: SharedThresholds,
  ) -> Self {
    Inspector {
      detector,
      annotator,
      styles,
      thresholds,
    }
  }

  pub fn styles(&self) -> &StyleTable {
    &self.styles
  }

  pub fn inspect(&self, frame: &Frame) -> Result<Inspection, InspectError<D::Error>> {
    let thresholds = self.thresholds.get();
    let detections = self
      .detector
      .detect(&frame.image, thresholds)
      .map_err(InspectError::Detector)?;

    let annotated = if detections.is_empty() {
      None
    } else {
      Some(self.annotator.annotate(&frame.image, &detections, &self.styles)?)
    };

    Ok(Inspection {
      detections,
      annotated,
    })
  }
}

/// 任务运行统计
#[derive(Debug, Default, Clone, Copy)]
pub struct Report {
  pub frames: u64,
  pub detections: usize,
  pub failures: u64,
}

/// 检验任务 trait
pub trait Task<D: Detector>: Sized {
  fn run_task(
    self,
    input: Box<dyn InputSource>,
    inspector: &Inspector<D>,
    output: &mut dyn OutputWriter,
  ) -> Result<Report>;
}

/// 按帧记录检验结论
fn report_frame<D: Detector>(frame: &Frame, inspection: &Inspection, inspector: &Inspector<D>) {
  let subject = frame
    .name
    .clone()
    .unwrap_or_else(|| format!("帧 {}", frame.index));

  if !inspection.defects_found() {
    info!("{}: 未检测到焊缝缺陷", subject);
    return;
  }

  warn!("{}: 检测到 {} 处焊缝缺陷", subject, inspection.detections.len());
  let styles = inspector.styles();
  for detection in &inspection.detections {
    let label = styles
      .get(&detection.class_id)
      .map(|style| styles.label(style))
      .unwrap_or(detection.class_id.as_str());
    info!(
      "  - {}: {:.1}% at ({:.0}, {:.0}) {:.0}x{:.0}",
      label,
      detection.confidence * 100.0,
      detection.x,
      detection.y,
      detection.width,
      detection.height
    );
  }
}

/// 单帧任务：取输入源的第一帧，失败即失败
pub struct OneShotTask;

impl<D: Detector> Task<D> for OneShotTask {
  fn run_task(
    self,
    mut input: Box<dyn InputSource>,
    inspector: &Inspector<D>,
    output: &mut dyn OutputWriter,
  ) -> Result<Report> {
    info!("开始单图检验...");
    let frame = input.next().ok_or_else(|| anyhow!("输入源没有任何帧"))??;

    let now = Instant::now();
    let inspection = inspector.inspect(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());

    report_frame(&frame, &inspection, inspector);
    output.write_frame(&frame, &inspection)?;
    output.finish()?;

    Ok(Report {
      frames: 1,
      detections: inspection.detections.len(),
      failures: 0,
    })
  }
}

/// 批量任务：逐项处理压缩包或目录中的全部图片
///
/// 单项失败只记录并跳过，批次继续；项与项之间输出分隔线。
pub struct BatchTask;

impl<D: Detector> Task<D> for BatchTask {
  fn run_task(
    self,
    input: Box<dyn InputSource>,
    inspector: &Inspector<D>,
    output: &mut dyn OutputWriter,
  ) -> Result<Report> {
    info!("开始批量检验...");
    let mut report = Report::default();

    for (position, item) in input.enumerate() {
      if position > 0 {
        info!("{}", BATCH_DIVIDER);
      }

      let frame = match item {
        Ok(frame) => frame,
        Err(error) => {
          warn!("读取输入帧失败，跳过: {:#}", error);
          report.failures += 1;
          continue;
        }
      };

      let inspection = match inspector.inspect(&frame) {
        Ok(inspection) => inspection,
        Err(error) => {
          warn!(
            "{} 检验失败，跳过: {:#}",
            frame.name.as_deref().unwrap_or("(无名帧)"),
            error
          );
          report.failures += 1;
          continue;
        }
      };

      report_frame(&frame, &inspection, inspector);
      report.frames += 1;
      report.detections += inspection.detections.len();
      output.write_frame(&frame, &inspection)?;
    }

    output.finish()?;
    Ok(report)
  }
}

/// 实时任务：持续处理视频流帧，直到 Ctrl-C 或达到帧数上限
///
/// 单帧的检测服务错误只记录并跳过（网络抖动不应中断实时流）；
/// 标注错误说明样式表与服务类别枚举不一致，属于配置问题，立即中止。
#[derive(Default)]
pub struct ContinuousTask {
  frame_limit: Option<u64>,
}

impl ContinuousTask {
  pub fn with_frame_limit(mut self, frame_limit: Option<u64>) -> Self {
    self.frame_limit = frame_limit;
    self
  }
}

impl<D: Detector> Task<D> for ContinuousTask {
  fn run_task(
    self,
    input: Box<dyn InputSource>,
    inspector: &Inspector<D>,
    output: &mut dyn OutputWriter,
  ) -> Result<Report> {
    info!("开始实时检验，Ctrl-C 结束...");
    let (tx, rx) = std::sync::mpsc::channel();

    ctrlc::set_handler(move || {
      info!("收到中断信号，准备退出...");
      let _ = tx.send(());
      thread::spawn(|| {
        thread::sleep(FORCE_EXIT_GRACE);
        warn!("强制退出程序");
        std::process::exit(1);
      });
    })?;

    let mut report = Report::default();

    for item in input {
      let frame = match item {
        Ok(frame) => frame,
        Err(error) => {
          warn!("读取视频帧失败，跳过: {:#}", error);
          report.failures += 1;
          continue;
        }
      };

      let now = Instant::now();
      match inspector.inspect(&frame) {
        Ok(inspection) => {
          report_frame(&frame, &inspection, inspector);
          report.frames += 1;
          report.detections += inspection.detections.len();
          output.write_frame(&frame, &inspection)?;
          info!("帧 {} 处理完成，耗时: {:.2?}", frame.index, now.elapsed());
        }
        Err(InspectError::Detector(error)) => {
          warn!("帧 {} 检测服务调用失败，跳过: {}", frame.index, error);
          report.failures += 1;
        }
        Err(error @ InspectError::Annotate(_)) => {
          output.finish()?;
          return Err(error.into());
        }
      }

      if self.frame_limit.map(|limit| report.frames >= limit).unwrap_or(false) {
        info!("达到帧数上限 {}, 结束实时检验", report.frames);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    output.finish()?;
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::detector::Detection;
  use crate::settings::Thresholds;
  use image::{Rgb, RgbImage};

  #[derive(Debug, Error)]
  #[error("检测服务不可用")]
  struct StubError;

  /// 固定应答的检测器桩
  struct StubDetector {
    detections: Vec<Detection>,
    fail: bool,
  }

  impl Detector for StubDetector {
    type Error = StubError;

    fn detect(
      &self,
      _image: &RgbImage,
      _thresholds: Thresholds,
    ) -> Result<Vec<Detection>, Self::Error> {
      if self.fail {
        return Err(StubError);
      }
      Ok(self.detections.clone())
    }
  }

  fn frame() -> Frame {
    Frame {
      image: RgbImage::from_pixel(64, 64, Rgb([80, 80, 80])),
      index: 0,
      timestamp_ms: 0,
      name: None,
    }
  }

  fn inspector(detector: StubDetector) -> Inspector<StubDetector> {
    Inspector::new(
      detector,
      Annotator::new(),
      StyleTable::default(),
      SharedThresholds::default(),
    )
  }

  #[test]
  fn no_detections_means_no_annotated_image() {
    let inspector = inspector(StubDetector {
      detections: Vec::new(),
      fail: false,
    });
    let inspection = inspector.inspect(&frame()).unwrap();
    assert!(!inspection.defects_found());
    assert!(inspection.annotated.is_none());
  }

  #[test]
  fn detections_produce_annotated_image() {
    let inspector = inspector(StubDetector {
      detections: vec![Detection {
        class_id: String::from("0"),
        x: 32.0,
        y: 32.0,
        width: 16.0,
        height: 16.0,
        confidence: 0.5,
      }],
      fail: false,
    });
    let inspection = inspector.inspect(&frame()).unwrap();
    assert!(inspection.defects_found());
    let annotated = inspection.annotated.unwrap();
    assert_eq!(annotated.dimensions(), (64, 64));
  }

  #[test]
  fn detector_failure_is_reported_as_such() {
    let inspector = inspector(StubDetector {
      detections: Vec::new(),
      fail: true,
    });
    assert!(matches!(
      inspector.inspect(&frame()),
      Err(InspectError::Detector(_))
    ));
  }

  #[test]
  fn unknown_class_surfaces_as_annotate_error() {
    let inspector = inspector(StubDetector {
      detections: vec![Detection {
        class_id: String::from("99"),
        x: 32.0,
        y: 32.0,
        width: 16.0,
        height: 16.0,
        confidence: 0.5,
      }],
      fail: false,
    });
    assert!(matches!(
      inspector.inspect(&frame()),
      Err(InspectError::Annotate(AnnotateError::UnknownClass { .. }))
    ));
  }
}
