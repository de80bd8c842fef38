use std::collections::BTreeMap;

use super::{DiffAnalyzer, Unrepresentable, source_file_of};
use crate::error::Result;
use crate::formats::{Gff, GffStruct, GffValue, LocalizedString};
use crate::mods::{Modification, ModificationsGff, ModifyGff};

/// 通用结构化字段分析
///
/// 字段按标签匹配，字段顺序不同不算差异。
pub struct GffAnalyzer;

impl DiffAnalyzer for GffAnalyzer {
    fn name(&self) -> &'static str {
        "gff"
    }

    fn analyze(&self, a: &[u8], b: &[u8], location: &str) -> Result<Option<Modification>> {
        let old = Gff::parse(a)?;
        let new = Gff::parse(b)?;
        let source_file = source_file_of(location);

        let mut walker = StructDiff {
            source_file: &source_file,
            modifiers: Vec::new(),
            problems: Unrepresentable::default(),
            added: 0,
        };
        if old.content_type != new.content_type {
            walker.problems.note(format!(
                "内容类型由 {:?} 变为 {:?}",
                old.content_type, new.content_type
            ));
        }
        walker.diff_struct(&old.root, &new.root, "");

        let StructDiff {
            modifiers, problems, ..
        } = walker;
        let modification = (!modifiers.is_empty()).then(|| {
            let mut m = ModificationsGff::new(source_file.clone());
            m.modifiers = modifiers;
            Modification::Gff(m)
        });
        problems.finish(location, modification)
    }
}

struct StructDiff<'a> {
    source_file: &'a str,
    modifiers: Vec<ModifyGff>,
    problems: Unrepresentable,
    added: usize,
}

fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}\\{child}")
    }
}

impl StructDiff<'_> {
    fn next_identifier(&mut self, kind: &str) -> String {
        let identifier = format!("{}_{kind}_{}", self.source_file, self.added);
        self.added += 1;
        identifier
    }

    fn diff_struct(&mut self, old: &GffStruct, new: &GffStruct, path: &str) {
        for field in &old.fields {
            if new.get(&field.label).is_none() {
                self.problems
                    .note(format!("删除了字段 {}", join_path(path, &field.label)));
            }
        }

        for field in &new.fields {
            let field_path = join_path(path, &field.label);
            match old.get(&field.label) {
                Some(before) => self.diff_value(before, &field.value, &field_path),
                None => {
                    if !is_addable(&field.value) {
                        self.problems
                            .note(format!("新增字段 {field_path} 的类型无法写入补丁"));
                        continue;
                    }
                    let identifier = self.next_identifier("addfield");
                    self.modifiers.push(ModifyGff::AddField {
                        identifier,
                        label: field.label.clone(),
                        path: path.to_string(),
                        value: field.value.clone(),
                    });
                }
            }
        }
    }

    fn diff_value(&mut self, old: &GffValue, new: &GffValue, path: &str) {
        if old.field_type() != new.field_type() {
            self.problems.note(format!(
                "字段 {path} 的类型由 {:?} 变为 {:?}",
                old.field_type(),
                new.field_type()
            ));
            return;
        }

        match (old, new) {
            (GffValue::Struct(a), GffValue::Struct(b)) => {
                if a.struct_id != b.struct_id {
                    self.problems.note(format!("结构 {path} 的类型编号变化"));
                }
                self.diff_struct(a, b, path);
            }
            (GffValue::List(a), GffValue::List(b)) => self.diff_list(a, b, path),
            (GffValue::LocString(a), GffValue::LocString(b)) => self.diff_locstring(a, b, path),
            (GffValue::Binary(a), GffValue::Binary(b)) => {
                if a != b {
                    self.problems.note(format!("二进制字段 {path} 的内容变化"));
                }
            }
            (a, b) => {
                if a != b {
                    self.modifiers.push(ModifyGff::ModifyField {
                        path: path.to_string(),
                        value: b.clone(),
                    });
                }
            }
        }
    }

    fn diff_list(&mut self, old: &[GffStruct], new: &[GffStruct], path: &str) {
        if new.len() < old.len() {
            self.problems.note(format!(
                "列表 {path} 删除了 {} 个元素",
                old.len() - new.len()
            ));
        }

        for (index, (a, b)) in old.iter().zip(new).enumerate() {
            if a.struct_id != b.struct_id {
                self.problems.note(format!("列表 {path} 第 {index} 个元素的类型编号变化"));
            }
            self.diff_struct(a, b, &join_path(path, &index.to_string()));
        }

        for extra in new.iter().skip(old.len()) {
            if !extra.fields.iter().all(|f| is_addable(&f.value)) {
                self.problems
                    .note(format!("列表 {path} 新增的元素含有无法写入补丁的字段"));
                continue;
            }
            let identifier = self.next_identifier("addstruct");
            self.modifiers.push(ModifyGff::AddStructToList {
                identifier,
                path: path.to_string(),
                value: extra.clone(),
            });
        }
    }

    fn diff_locstring(&mut self, old: &LocalizedString, new: &LocalizedString, path: &str) {
        for id in old.substrings.keys() {
            if !new.substrings.contains_key(id) {
                self.problems.note(format!("{path} 删除了语言 {id} 的文本"));
            }
        }

        let stringref = (old.stringref != new.stringref).then_some(new.stringref);
        let substrings: BTreeMap<u32, String> = new
            .substrings
            .iter()
            .filter(|(id, text)| old.substrings.get(*id) != Some(*text))
            .map(|(id, text)| (*id, text.clone()))
            .collect();

        if stringref.is_some() || !substrings.is_empty() {
            self.modifiers.push(ModifyGff::ModifyLocString {
                path: path.to_string(),
                stringref,
                substrings,
            });
        }
    }
}

/// 补丁能否新增该值 (递归检查子结构)
fn is_addable(value: &GffValue) -> bool {
    if value.field_type().patch_name().is_none() {
        return false;
    }
    match value {
        GffValue::Struct(s) => s.fields.iter().all(|f| is_addable(&f.value)),
        GffValue::List(items) => items
            .iter()
            .all(|s| s.fields.iter().all(|f| is_addable(&f.value))),
        _ => true,
    }
}
