// 该文件是 Hanjian （焊检） 项目的一部分。
// src/lib.rs - 库主文件
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

//! Hanjian （焊检）：焊缝缺陷目检工具。
//!
//! 把单张图片、图片压缩包、图片目录或实时视频流送往远程目标检测服务，
//! 并在图像上渲染带颜色与标签的缺陷边界框。

pub mod annotate;
pub mod classes;
pub mod detector;
pub mod input;
pub mod output;
pub mod settings;
pub mod task;
