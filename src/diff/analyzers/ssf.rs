use super::{DiffAnalyzer, source_file_of};
use crate::error::Result;
use crate::formats::Ssf;
use crate::mods::{Modification, ModificationsSsf, ModifySsf};

/// 音效集分析，逐槽位比较字符串引用
pub struct SsfAnalyzer;

impl DiffAnalyzer for SsfAnalyzer {
    fn name(&self) -> &'static str {
        "ssf"
    }

    fn analyze(&self, a: &[u8], b: &[u8], location: &str) -> Result<Option<Modification>> {
        let old = Ssf::parse(a)?;
        let new = Ssf::parse(b)?;

        let modifiers: Vec<ModifySsf> = old
            .slots
            .iter()
            .zip(new.slots.iter())
            .enumerate()
            .filter(|(_, (before, after))| before != after)
            .map(|(sound, (_, after))| ModifySsf {
                sound,
                stringref: *after,
            })
            .collect();

        if modifiers.is_empty() {
            return Ok(None);
        }
        let mut m = ModificationsSsf::new(source_file_of(location));
        m.modifiers = modifiers;
        Ok(Some(Modification::Ssf(m)))
    }
}
