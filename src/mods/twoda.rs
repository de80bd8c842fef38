use std::collections::BTreeMap;

/// 针对一个 2DA 文件的全部修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Modifications2Da {
    pub source_file: String,
    pub destination: Option<String>,
    pub save_as: Option<String>,
    pub modifiers: Vec<Modify2Da>,
}

impl Modifications2Da {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            destination: None,
            save_as: None,
            modifiers: Vec::new(),
        }
    }
}

/// 单条表格修改，单元格以 (列名, 值) 记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modify2Da {
    ChangeRow {
        identifier: String,
        /// 数字行标签或行号，可为负
        row_index: i64,
        cells: Vec<(String, String)>,
    },
    AddRow {
        identifier: String,
        row_label: String,
        cells: Vec<(String, String)>,
    },
    AddColumn {
        identifier: String,
        header: String,
        default: String,
        /// 行号 -> 与默认值不同的单元格
        index_insert: BTreeMap<usize, String>,
    },
}

impl Modify2Da {
    pub fn identifier(&self) -> &str {
        match self {
            Modify2Da::ChangeRow { identifier, .. }
            | Modify2Da::AddRow { identifier, .. }
            | Modify2Da::AddColumn { identifier, .. } => identifier,
        }
    }
}
