// 该文件是 Hanjian （焊检） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use hanjian::annotate::Annotator;
use hanjian::classes::StyleTable;
use hanjian::detector::RemoteDetector;
use hanjian::input::{InputSourceType, create_input_source};
use hanjian::output::{OutputOptions, create_output_writer};
use hanjian::settings::{SharedThresholds, Thresholds};
use hanjian::task::{BatchTask, ContinuousTask, Inspector, OneShotTask, Task};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("推理服务: {} / {} v{}", args.endpoint, args.model, args.model_version);
  info!("置信度阈值: {}", args.confidence);
  info!("重叠阈值: {}", args.overlap);

  let thresholds = SharedThresholds::new(Thresholds::new(args.confidence, args.overlap)?);
  let styles = StyleTable::new(args.labels.into());

  let detector = RemoteDetector::builder(args.api_key)
    .base(args.endpoint.as_str())
    .model(args.model.as_str())
    .version(args.model_version.as_str())
    .timeout(Duration::from_secs(args.timeout))
    .build()?;

  let inspector = Inspector::new(detector, Annotator::new(), styles, thresholds);

  let input = create_input_source(&args.input)?;
  let mut output = create_output_writer(
    &args.output,
    OutputOptions {
      compare: args.compare,
      record: args.record,
      always: args.save_clean,
      styles,
    },
  )?;

  let report = match input.source_type() {
    InputSourceType::Image => OneShotTask.run_task(input, &inspector, output.as_mut())?,
    InputSourceType::Archive | InputSourceType::Directory => {
      BatchTask.run_task(input, &inspector, output.as_mut())?
    }
    InputSourceType::Live => {
      let frame_limit = (args.max_frames > 0).then_some(args.max_frames);
      ContinuousTask::default()
        .with_frame_limit(frame_limit)
        .run_task(input, &inspector, output.as_mut())?
    }
  };

  info!(
    "处理完成: 共 {} 帧, {} 处检测, {} 次失败",
    report.frames, report.detections, report.failures
  );

  Ok(())
}
