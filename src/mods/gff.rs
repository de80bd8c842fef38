use std::collections::BTreeMap;

use crate::formats::{GffStruct, GffValue};

/// 针对一个结构化资源的全部修改
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationsGff {
    pub source_file: String,
    pub destination: Option<String>,
    pub save_as: Option<String>,
    pub modifiers: Vec<ModifyGff>,
}

impl ModificationsGff {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            destination: None,
            save_as: None,
            modifiers: Vec::new(),
        }
    }
}

/// 路径使用 `\` 分隔，列表元素以下标表示，例如 `ItemList\0\InventoryRes`
#[derive(Debug, Clone, PartialEq)]
pub enum ModifyGff {
    /// 修改已有字段的值
    ModifyField { path: String, value: GffValue },
    /// 修改本地化字符串的部分内容
    ModifyLocString {
        path: String,
        stringref: Option<i32>,
        substrings: BTreeMap<u32, String>,
    },
    /// 在 `path` 指向的结构中新增字段，结构和列表的子项一并写出
    AddField {
        identifier: String,
        label: String,
        path: String,
        value: GffValue,
    },
    /// 向 `path` 指向的列表追加结构
    AddStructToList {
        identifier: String,
        path: String,
        value: GffStruct,
    },
}
