// 该文件是 Hanjian （焊检） 项目的一部分。
// src/classes.rs - 焊缝缺陷类别样式表
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

use image::Rgb;

/// 单个缺陷类别的显示样式
#[derive(Debug, Clone, Copy)]
pub struct ClassStyle {
  /// 检测服务返回的类别标识
  pub id: &'static str,
  /// 边框与标签底色
  pub color: Rgb<u8>,
  /// 英文标签
  pub name: &'static str,
  /// 俄文标签
  pub name_ru: &'static str,
}

/// 焊缝缺陷类别表
///
/// 检测服务的类别枚举固定为 8 类，进程内只有这一份静态配置，
/// 单图、批量与实时路径共用，避免多份表之间漂移。
pub const DEFECT_CLASSES: [ClassStyle; 8] = [
  ClassStyle {
    id: "0",
    color: Rgb([0xE2, 0x3D, 0x28]), // #E23D28
    name: "Air-hole",
    name_ru: "Пора",
  },
  ClassStyle {
    id: "1",
    color: Rgb([0xFF, 0xBF, 0x00]), // #FFBF00
    name: "Bite-edge",
    name_ru: "Подрез",
  },
  ClassStyle {
    id: "2",
    color: Rgb([0xFF, 0x82, 0x00]), // #FF8200
    name: "Broken-arc",
    name_ru: "Разрыв дуги",
  },
  ClassStyle {
    id: "3",
    color: Rgb([0xFF, 0xEF, 0x00]), // #FFEF00
    name: "Crack",
    name_ru: "Трещина",
  },
  ClassStyle {
    id: "4",
    color: Rgb([0xCB, 0x41, 0x0B]), // #CB410B
    name: "Undercut",
    name_ru: "Подрез",
  },
  ClassStyle {
    id: "5",
    color: Rgb([0xED, 0x1B, 0x24]), // #ED1B24
    name: "Overlap",
    name_ru: "Натёк",
  },
  ClassStyle {
    id: "6",
    color: Rgb([0xF5, 0xF5, 0xDC]), // #F5F5DC
    name: "Slag-inclusion",
    name_ru: "Включение шлака",
  },
  ClassStyle {
    id: "7",
    color: Rgb([0xFF, 0x38, 0x00]), // #FF3800
    name: "Unfused",
    name_ru: "Непровар",
  },
];

/// 标签语言
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelLanguage {
  #[default]
  English,
  Russian,
}

/// 类别样式表视图
///
/// 底层数据始终是 [`DEFECT_CLASSES`]，本类型只携带标签语言选择。
/// 查不到的类别标识视为配置与检测服务版本不匹配，由调用方作为错误处理。
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleTable {
  language: LabelLanguage,
}

impl StyleTable {
  pub const fn new(language: LabelLanguage) -> Self {
    StyleTable { language }
  }

  /// 按类别标识查找样式
  pub fn get(&self, class_id: &str) -> Option<&'static ClassStyle> {
    DEFECT_CLASSES.iter().find(|style| style.id == class_id)
  }

  /// 按当前语言取标签文本
  pub fn label(&self, style: &ClassStyle) -> &'static str {
    match self.language {
      LabelLanguage::English => style.name,
      LabelLanguage::Russian => style.name_ru,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn class_ids_are_unique_and_complete() {
    for (index, style) in DEFECT_CLASSES.iter().enumerate() {
      assert_eq!(style.id, index.to_string());
    }
  }

  #[test]
  fn lookup_known_and_unknown() {
    let table = StyleTable::default();
    let crack = table.get("3").unwrap();
    assert_eq!(crack.name, "Crack");
    assert_eq!(crack.color, Rgb([0xFF, 0xEF, 0x00]));
    assert!(table.get("8").is_none());
    assert!(table.get("crack").is_none());
  }

  #[test]
  fn label_follows_language() {
    let style = StyleTable::new(LabelLanguage::English);
    let ru = StyleTable::new(LabelLanguage::Russian);
    let unfused = style.get("7").unwrap();
    assert_eq!(style.label(unfused), "Unfused");
    assert_eq!(ru.label(unfused), "Непровар");
  }
}
