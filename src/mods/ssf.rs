use crate::formats::SOUND_NAMES;

/// 针对一个音效集的修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationsSsf {
    pub source_file: String,
    pub destination: Option<String>,
    pub save_as: Option<String>,
    pub modifiers: Vec<ModifySsf>,
}

impl ModificationsSsf {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            destination: None,
            save_as: None,
            modifiers: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModifySsf {
    /// 槽位下标
    pub sound: usize,
    pub stringref: i32,
}

impl ModifySsf {
    pub fn sound_name(&self) -> &'static str {
        SOUND_NAMES.get(self.sound).copied().unwrap_or("Unknown")
    }
}
