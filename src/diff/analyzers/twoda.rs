use std::collections::{BTreeMap, HashMap};

use super::{DiffAnalyzer, Unrepresentable, source_file_of};
use crate::error::Result;
use crate::formats::TwoDa;
use crate::mods::{Modification, Modifications2Da, Modify2Da};

/// 2DA 中表示空值的占位符
const BLANK: &str = "****";

/// 行列结构分析
pub struct TwoDaAnalyzer;

impl DiffAnalyzer for TwoDaAnalyzer {
    fn name(&self) -> &'static str {
        "2da"
    }

    fn analyze(&self, a: &[u8], b: &[u8], location: &str) -> Result<Option<Modification>> {
        let old = TwoDa::parse(a)?;
        let new = TwoDa::parse(b)?;
        let source_file = source_file_of(location);
        let mut problems = Unrepresentable::default();

        for header in &old.headers {
            if new.column_index(header).is_none() {
                problems.note(format!("删除了列 {header}"));
            }
        }
        if new.rows.len() < old.rows.len() {
            problems.note(format!(
                "删除了 {} 行",
                old.rows.len() - new.rows.len()
            ));
        }

        let mut modifiers = Vec::new();
        change_rows(&old, &new, &source_file, &mut modifiers);
        add_columns(&old, &new, &source_file, &mut modifiers);
        add_rows(&old, &new, &source_file, &mut modifiers);

        let modification = (!modifiers.is_empty()).then(|| {
            let mut m = Modifications2Da::new(source_file);
            m.modifiers = modifiers;
            Modification::TwoDa(m)
        });
        problems.finish(location, modification)
    }
}

/// 两边都有的行中，公共列取值不同的单元格
fn change_rows(old: &TwoDa, new: &TwoDa, source_file: &str, modifiers: &mut Vec<Modify2Da>) {
    let common: Vec<(&String, usize, usize)> = old
        .headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| new.column_index(h).map(|j| (h, i, j)))
        .collect();

    let mut count = 0;
    for (index, (old_row, new_row)) in old.rows.iter().zip(&new.rows).enumerate() {
        let cells: Vec<(String, String)> = common
            .iter()
            .filter_map(|(header, i, j)| {
                let before = old_row.cells.get(*i).map(String::as_str).unwrap_or("");
                let after = new_row.cells.get(*j).map(String::as_str).unwrap_or("");
                (before != after).then(|| (header.to_string(), after.to_string()))
            })
            .collect();
        if cells.is_empty() {
            continue;
        }

        // 依次尝试新旧行标签，都不是数字时按行号
        let row_index = numeric_label(&new_row.label)
            .or_else(|| numeric_label(&old_row.label))
            .unwrap_or(index as i64);
        modifiers.push(Modify2Da::ChangeRow {
            identifier: format!("{source_file}_changerow_{count}"),
            row_index,
            cells,
        });
        count += 1;
    }
}

/// 可带正负号的十进制行标签
fn numeric_label(label: &str) -> Option<i64> {
    let trimmed = label.trim();
    let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// 新增的列，按列名排序
fn add_columns(old: &TwoDa, new: &TwoDa, source_file: &str, modifiers: &mut Vec<Modify2Da>) {
    let mut added: Vec<(&String, usize)> = new
        .headers
        .iter()
        .enumerate()
        .filter(|(_, h)| old.column_index(h).is_none())
        .map(|(j, h)| (h, j))
        .collect();
    added.sort();

    for (count, (header, column)) in added.into_iter().enumerate() {
        let values: Vec<&str> = new
            .rows
            .iter()
            .map(|r| r.cells.get(column).map(String::as_str).unwrap_or(""))
            .collect();
        let default = default_value(&values);

        // 新增行的单元格由 AddRow 写出
        let index_insert: BTreeMap<usize, String> = values
            .iter()
            .enumerate()
            .take(old.rows.len())
            .filter(|(_, v)| **v != default)
            .map(|(row, v)| (row, v.to_string()))
            .collect();

        modifiers.push(Modify2Da::AddColumn {
            identifier: format!("{source_file}_{header}_addcol_{count}"),
            header: header.clone(),
            default,
            index_insert,
        });
    }
}

/// 推断新增列的默认值
///
/// 超过四分之一为 `****` 时取 `****`；出现最多的值超过一半时取该值；
/// 出现最多的是空串且超过四分之一时取空串；其余情况取 `****`。
pub(crate) fn default_value(values: &[&str]) -> String {
    let total = values.len();
    if total == 0 {
        return BLANK.to_string();
    }

    let blanks = values.iter().filter(|v| **v == BLANK).count();
    if blanks * 4 > total {
        return BLANK.to_string();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values.iter().copied() {
        *counts.entry(value).or_default() += 1;
    }
    // 次数相同时取字典序最小的值，保证结果稳定
    let (common, count) = counts
        .into_iter()
        .max_by(|(va, ca), (vb, cb)| ca.cmp(cb).then_with(|| vb.cmp(va)))
        .unwrap_or((BLANK, 0));

    if count * 2 > total {
        common.to_string()
    } else if common.is_empty() && count * 4 > total {
        String::new()
    } else {
        BLANK.to_string()
    }
}

/// 新表末尾多出的行
fn add_rows(old: &TwoDa, new: &TwoDa, source_file: &str, modifiers: &mut Vec<Modify2Da>) {
    for (count, row) in new.rows.iter().skip(old.rows.len()).enumerate() {
        let cells = new
            .headers
            .iter()
            .zip(&row.cells)
            .filter(|(_, value)| !value.is_empty())
            .map(|(header, value)| (header.clone(), value.clone()))
            .collect();
        modifiers.push(Modify2Da::AddRow {
            identifier: format!("{source_file}_addrow_{count}"),
            row_label: row.label.clone(),
            cells,
        });
    }
}
