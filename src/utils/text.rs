use encoding_rs::WINDOWS_1252;
use similar::{ChangeTag, DiffOp, TextDiff};

use crate::config::DiffFormat;

/// Windows-1252 中未定义的字节
const CP1252_UNDEFINED: [u8; 5] = [0x81, 0x8D, 0x8F, 0x90, 0x9D];

/// 可打印字符比例阈值
const PRINTABLE_RATIO: f64 = 0.7;

/// 并排格式的总宽度
const SIDE_BY_SIDE_WIDTH: usize = 80;

pub fn decode_cp1252(bytes: &[u8]) -> String {
    let (text, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
    text.into_owned()
}

pub fn encode_cp1252(text: &str) -> Vec<u8> {
    let (bytes, _, _) = WINDOWS_1252.encode(text);
    bytes.into_owned()
}

/// 判断数据是否像文本
///
/// 含 NUL 的数据只做可打印比例检查；否则依次尝试 UTF-8、
/// 严格的 Windows-1252，最后退回可打印比例检查。
pub fn is_text_content(data: &[u8]) -> bool {
    if data.is_empty() {
        return true;
    }
    if !data.contains(&0) {
        if std::str::from_utf8(data).is_ok() {
            return true;
        }
        if !data.iter().any(|b| CP1252_UNDEFINED.contains(b)) {
            return true;
        }
    }
    printable_ratio(data) >= PRINTABLE_RATIO
}

fn printable_ratio(data: &[u8]) -> f64 {
    let printable = data
        .iter()
        .filter(|b| matches!(**b, 9 | 10 | 13 | 32..=126))
        .count();
    printable as f64 / data.len() as f64
}

/// 按 UTF-8 优先解码为文本
pub fn decode_text(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(_) => decode_cp1252(data),
    }
}

/// 逐行比较两段文本，换行符风格不同视为相同
pub fn text_lines_equal(a: &str, b: &str) -> bool {
    a.lines().eq(b.lines())
}

/// 生成统一格式的文本差异
pub fn unified_text_diff(a: &str, b: &str, label_a: &str, label_b: &str) -> String {
    let a = normalize_newlines(a);
    let b = normalize_newlines(b);
    TextDiff::from_lines(&a, &b)
        .unified_diff()
        .context_radius(3)
        .header(label_a, label_b)
        .to_string()
}

/// 按指定格式渲染两段文本的差异
pub fn render_text_diff(format: DiffFormat, a: &str, b: &str, label_a: &str, label_b: &str) -> String {
    match format {
        DiffFormat::Default => format!("'{label_a}' 与 '{label_b}' 的文本不同"),
        DiffFormat::Unified => unified_text_diff(a, b, label_a, label_b),
        DiffFormat::Context => context_text_diff(a, b, label_a, label_b),
        DiffFormat::SideBySide => side_by_side_text_diff(a, b, label_a, label_b, SIDE_BY_SIDE_WIDTH),
    }
}

/// 无法逐行展示的差异，只给出两边的位置和大小
pub fn render_binary_diff(
    format: DiffFormat,
    label_a: &str,
    label_b: &str,
    size_a: usize,
    size_b: usize,
) -> String {
    match format {
        DiffFormat::Default => {
            format!("'{label_a}' 与 '{label_b}' 不同 (大小: {size_a} / {size_b})")
        }
        DiffFormat::Unified => format!("--- {label_a}\n+++ {label_b}\n二进制内容不同"),
        DiffFormat::Context => format!("*** {label_a}\n--- {label_b}\n二进制内容不同"),
        DiffFormat::SideBySide => format!("< {label_a} | > {label_b}\n二进制内容不同"),
    }
}

/// 上下文格式：每组改动前后各保留三行，`- ` 为删除，`+ ` 为新增
pub fn context_text_diff(a: &str, b: &str, label_a: &str, label_b: &str) -> String {
    let a = normalize_newlines(a);
    let b = normalize_newlines(b);
    let diff = TextDiff::from_lines(&a, &b);

    let mut out = vec![format!("*** {label_a}"), format!("--- {label_b}")];
    for group in diff.grouped_ops(3) {
        out.push("***************".to_string());
        for op in &group {
            for change in diff.iter_changes(op) {
                let prefix = match change.tag() {
                    ChangeTag::Equal => "  ",
                    ChangeTag::Delete => "- ",
                    ChangeTag::Insert => "+ ",
                };
                out.push(format!("{prefix}{}", change.value().trim_end_matches('\n')));
            }
        }
    }
    out.join("\n")
}

/// 并排格式：左右各占一半宽度，中间标记 `*` 修改、`-` 删除、`+` 新增
pub fn side_by_side_text_diff(a: &str, b: &str, label_a: &str, label_b: &str, width: usize) -> String {
    let a = normalize_newlines(a);
    let b = normalize_newlines(b);
    let diff = TextDiff::from_lines(&a, &b);
    let old = diff.old_slices();
    let new = diff.new_slices();
    let column = width.saturating_sub(3) / 2;

    let mut out = vec![format!("< {label_a} | > {label_b}")];
    let mut push = |left: Option<&str>, right: Option<&str>, marker: char| {
        let left = truncate(left.unwrap_or(""), column);
        let right = truncate(right.unwrap_or(""), column);
        let line = format!("{left:<column$} | {marker} {right}");
        out.push(line.trim_end().to_string());
    };

    for op in diff.ops() {
        match *op {
            DiffOp::Equal { old_index, new_index, len } => {
                for i in 0..len {
                    push(Some(old[old_index + i]), Some(new[new_index + i]), ' ');
                }
            }
            DiffOp::Delete { old_index, old_len, .. } => {
                for line in &old[old_index..old_index + old_len] {
                    push(Some(*line), None, '-');
                }
            }
            DiffOp::Insert { new_index, new_len, .. } => {
                for line in &new[new_index..new_index + new_len] {
                    push(None, Some(*line), '+');
                }
            }
            DiffOp::Replace {
                old_index,
                old_len,
                new_index,
                new_len,
            } => {
                for i in 0..old_len.max(new_len) {
                    let left = (i < old_len).then(|| old[old_index + i]);
                    let right = (i < new_len).then(|| new[new_index + i]);
                    let marker = match (left, right) {
                        (Some(_), Some(_)) => '*',
                        (Some(_), None) => '-',
                        _ => '+',
                    };
                    push(left, right, marker);
                }
            }
        }
    }
    out.join("\n")
}

fn truncate(line: &str, max: usize) -> String {
    let line = line.trim_end_matches('\n');
    if line.chars().count() <= max {
        return line.to_string();
    }
    let keep = max.saturating_sub(3);
    format!("{}...", line.chars().take(keep).collect::<String>())
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
