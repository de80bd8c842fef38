/// 字符串表修改
///
/// 只支持追加：`source_file` 是暂存的追加表，`save_as` 是被追加的游戏字符串表。
#[derive(Debug, Clone, PartialEq)]
pub struct ModificationsTlk {
    pub source_file: String,
    pub save_as: String,
    pub destination: Option<String>,
    pub modifiers: Vec<ModifyTlk>,
}

pub const APPEND_TLK: &str = "append.tlk";

impl ModificationsTlk {
    pub fn new(save_as: impl Into<String>) -> Self {
        Self {
            source_file: APPEND_TLK.to_string(),
            save_as: save_as.into(),
            destination: None,
            modifiers: Vec::new(),
        }
    }

    pub fn has_appends(&self) -> bool {
        self.modifiers.iter().any(|m| !m.is_replacement)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModifyTlk {
    /// 令牌编号，写入器会重新分配
    pub token_id: usize,
    /// 条目在新表中的下标
    pub mod_index: usize,
    pub text: String,
    pub sound: String,
    pub is_replacement: bool,
}

impl ModifyTlk {
    pub fn append(token_id: usize, mod_index: usize, text: impl Into<String>, sound: impl Into<String>) -> Self {
        Self {
            token_id,
            mod_index,
            text: text.into(),
            sound: sound.into(),
            is_replacement: false,
        }
    }
}
