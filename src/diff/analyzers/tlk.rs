use super::{DiffAnalyzer, Unrepresentable, source_file_of};
use crate::error::Result;
use crate::formats::Tlk;
use crate::mods::{Modification, ModificationsTlk, ModifyTlk};

/// 字符串表分析
///
/// 新增和内容变化的条目都记为追加，从不生成原位替换。
pub struct TlkAnalyzer;

impl DiffAnalyzer for TlkAnalyzer {
    fn name(&self) -> &'static str {
        "tlk"
    }

    fn analyze(&self, a: &[u8], b: &[u8], location: &str) -> Result<Option<Modification>> {
        let old = Tlk::parse(a)?;
        let new = Tlk::parse(b)?;
        let mut problems = Unrepresentable::default();

        if old.language != new.language {
            problems.note(format!(
                "语言由 {} 变为 {}",
                old.language, new.language
            ));
        }
        if new.entries.len() < old.entries.len() {
            problems.note(format!(
                "删除了 {} 个条目",
                old.entries.len() - new.entries.len()
            ));
        }

        let mut modifiers = Vec::new();
        for (index, entry) in new.entries.iter().enumerate() {
            let changed = match old.entries.get(index) {
                Some(before) => !before.same_content(entry),
                None => true,
            };
            if changed {
                modifiers.push(ModifyTlk::append(
                    modifiers.len(),
                    index,
                    entry.text.clone(),
                    entry.sound.clone(),
                ));
            }
        }

        let modification = (!modifiers.is_empty()).then(|| {
            let mut m = ModificationsTlk::new(source_file_of(location));
            m.modifiers = modifiers;
            Modification::Tlk(m)
        });
        problems.finish(location, modification)
    }
}
