//! 补丁定义文件 (changes.ini) 的生成
//!
//! 安装器按固定顺序读取六个列表段，顺序不能改变：
//! `[TLKList]`、`[InstallList]`、`[2DAList]`、`[GFFList]`、`[CompileList]`、`[SSFList]`。
//! 各文件的明细段写在列表段之后。

use chrono::Utc;

use crate::config::{DiffConfig, PatchSettings};
use crate::formats::{GffStruct, GffValue};
use crate::mods::{
    InstallFolderMap, Modifications2Da, ModificationsByType, ModificationsGff, ModificationsSsf,
    Modify2Da, ModifyGff,
};

const RULE: &str = "; ============================================================================";

/// 文件头注释与 `[Settings]` 使用的信息
#[derive(Debug, Clone, PartialEq)]
pub struct IniHeader {
    pub tool_name: String,
    /// `MM/dd/yyyy`
    pub date: String,
    pub settings: PatchSettings,
}

impl IniHeader {
    pub fn new(config: &DiffConfig) -> Self {
        Self {
            tool_name: config.tool_name.clone(),
            date: Utc::now().format("%m/%d/%Y").to_string(),
            settings: config.settings.clone(),
        }
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = date.into();
        self
    }
}

/// 一个 `[name]` 段及其键值
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Section {
    name: String,
    entries: Vec<(String, String)>,
}

impl Section {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    fn key(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    fn render(&self, out: &mut Vec<String>) {
        out.push(format!("[{}]", self.name));
        out.extend(self.entries.iter().map(|(k, v)| format!("{k}={v}")));
        out.push(String::new());
    }
}

/// 用完整的修改累加器渲染整个补丁定义文件
///
/// 空累加器渲染出的就是初始骨架。输出只取决于参数，不读取时钟。
pub fn render_ini(
    header: &IniHeader,
    modifications: &ModificationsByType,
    folders: &InstallFolderMap,
) -> String {
    let mut lists = vec![
        Section::new("TLKList"),
        Section::new("InstallList"),
        Section::new("2DAList"),
        Section::new("GFFList"),
        Section::new("CompileList"),
        Section::new("SSFList"),
    ];
    let mut details = Vec::new();

    // 所有追加条目共享同一个 append.tlk，令牌在写入器中已全局唯一
    let mut appends: Vec<_> = modifications
        .tlk
        .iter()
        .flat_map(|m| m.modifiers.iter())
        .filter(|m| !m.is_replacement)
        .collect();
    appends.sort_by_key(|m| m.token_id);
    for (index, append) in appends.iter().enumerate() {
        lists[0].key(format!("StrRef{}", append.token_id), index.to_string());
    }

    for (i, (folder, files)) in folders.folders().enumerate() {
        let name = format!("install_folder{i}");
        lists[1].key(name.clone(), folder);
        let mut section = Section::new(name);
        for (j, file) in files.iter().enumerate() {
            section.key(format!("File{j}"), file.as_str());
        }
        details.push(section);
    }

    for (i, m) in modifications.twoda.iter().enumerate() {
        lists[2].key(format!("Table{i}"), m.source_file.as_str());
        twoda_sections(m, &mut details);
    }

    for (i, m) in modifications.gff.iter().enumerate() {
        lists[3].key(format!("File{i}"), m.source_file.as_str());
        gff_sections(m, &mut details);
    }

    for (i, m) in modifications.ssf.iter().enumerate() {
        lists[5].key(format!("File{i}"), m.source_file.as_str());
        details.push(ssf_section(m));
    }

    let mut out = header_lines(header);
    for section in lists.iter().chain(details.iter()) {
        section.render(&mut out);
    }
    let mut text = out.join("\n");
    text.push('\n');
    text
}

fn header_lines(header: &IniHeader) -> Vec<String> {
    let settings = &header.settings;
    vec![
        RULE.to_string(),
        format!(
            ";  TSLPatcher Modifications File - Generated by {} ({})",
            header.tool_name, header.date
        ),
        RULE.to_string(),
        ";".to_string(),
        ";  This file is machine-generated and TSLPatcher-compliant.".to_string(),
        ";  Blank lines and comments may be added between sections, never inside one.".to_string(),
        RULE.to_string(),
        String::new(),
        "[Settings]".to_string(),
        "FileExists=1".to_string(),
        format!("WindowCaption={}", settings.window_caption),
        format!("ConfirmMessage={}", settings.confirm_message),
        "LogLevel=3".to_string(),
        "InstallerMode=1".to_string(),
        "BackupFiles=1".to_string(),
        "PlaintextLog=0".to_string(),
        "LookupGameFolder=0".to_string(),
        format!("LookupGameNumber={}", settings.lookup_game_number),
        "SaveProcessedScripts=0".to_string(),
        String::new(),
    ]
}

fn twoda_sections(m: &Modifications2Da, out: &mut Vec<Section>) {
    let mut file = Section::new(m.source_file.as_str());
    let mut modifiers = Vec::new();
    let (mut changes, mut columns, mut rows) = (0, 0, 0);

    for modifier in &m.modifiers {
        let mut section = Section::new(modifier.identifier());
        match modifier {
            Modify2Da::ChangeRow {
                row_index, cells, ..
            } => {
                file.key(format!("ChangeRow{changes}"), modifier.identifier());
                changes += 1;
                section.key("RowIndex", row_index.to_string());
                for (header, value) in cells {
                    section.key(header.as_str(), value.as_str());
                }
            }
            Modify2Da::AddRow {
                row_label, cells, ..
            } => {
                file.key(format!("AddRow{rows}"), modifier.identifier());
                rows += 1;
                section.key("RowLabel", row_label.as_str());
                for (header, value) in cells.iter().filter(|(_, v)| !v.is_empty()) {
                    section.key(header.as_str(), value.as_str());
                }
            }
            Modify2Da::AddColumn {
                header,
                default,
                index_insert,
                ..
            } => {
                file.key(format!("AddColumn{columns}"), modifier.identifier());
                columns += 1;
                section.key("ColumnLabel", header.as_str());
                section.key("DefaultValue", default.as_str());
                for (row, value) in index_insert {
                    section.key(format!("I{row}"), value.as_str());
                }
            }
        }
        modifiers.push(section);
    }

    out.push(file);
    out.extend(modifiers);
}

fn gff_sections(m: &ModificationsGff, out: &mut Vec<Section>) {
    let mut file = Section::new(m.source_file.as_str());
    let mut added = Vec::new();
    let mut add_count = 0;

    for modifier in &m.modifiers {
        match modifier {
            ModifyGff::ModifyField { path, value } => {
                if let Some(text) = field_value(value) {
                    file.key(path.as_str(), text);
                }
            }
            ModifyGff::ModifyLocString {
                path,
                stringref,
                substrings,
            } => {
                if let Some(stringref) = stringref {
                    file.key(format!("{path}(strref)"), stringref.to_string());
                }
                for (id, text) in substrings {
                    file.key(format!("{path}(lang{id})"), escape_text(text));
                }
            }
            ModifyGff::AddField {
                identifier,
                label,
                path,
                value,
            } => {
                file.key(format!("AddField{add_count}"), identifier.as_str());
                add_count += 1;
                add_field_sections(identifier, label, Some(path), value, &mut added);
            }
            ModifyGff::AddStructToList {
                identifier,
                path,
                value,
            } => {
                file.key(format!("AddField{add_count}"), identifier.as_str());
                add_count += 1;
                add_struct_sections(identifier, "", Some(path), value, &mut added);
            }
        }
    }

    out.push(file);
    out.extend(added);
}

/// 新增字段段落；子字段写成嵌套段落，不带 `Path`
fn add_field_sections(
    identifier: &str,
    label: &str,
    path: Option<&str>,
    value: &GffValue,
    out: &mut Vec<Section>,
) {
    if let GffValue::Struct(s) = value {
        add_struct_sections(identifier, label, path, s, out);
        return;
    }

    let mut section = Section::new(identifier);
    section.key(
        "FieldType",
        value.field_type().patch_name().unwrap_or_default(),
    );
    section.key("Label", label);
    if let Some(path) = path {
        section.key("Path", path);
    }

    let mut nested = Vec::new();
    match value {
        GffValue::LocString(loc) => {
            section.key("StrRef", loc.stringref.to_string());
            for (id, text) in &loc.substrings {
                section.key(format!("lang{id}"), escape_text(text));
            }
        }
        GffValue::List(items) => {
            for (k, item) in items.iter().enumerate() {
                let child = format!("{identifier}_{k}");
                section.key(format!("AddField{k}"), child.as_str());
                add_struct_sections(&child, "", None, item, &mut nested);
            }
        }
        other => {
            if let Some(text) = field_value(other) {
                section.key("Value", text);
            }
        }
    }

    out.push(section);
    out.extend(nested);
}

fn add_struct_sections(
    identifier: &str,
    label: &str,
    path: Option<&str>,
    value: &GffStruct,
    out: &mut Vec<Section>,
) {
    let mut section = Section::new(identifier);
    section.key("FieldType", "Struct");
    section.key("Label", label);
    if let Some(path) = path {
        section.key("Path", path);
    }
    section.key("TypeId", value.struct_id.to_string());

    let mut nested = Vec::new();
    for (k, field) in value.fields.iter().enumerate() {
        let child = format!("{identifier}_{k}");
        section.key(format!("AddField{k}"), child.as_str());
        add_field_sections(&child, &field.label, None, &field.value, &mut nested);
    }

    out.push(section);
    out.extend(nested);
}

fn ssf_section(m: &ModificationsSsf) -> Section {
    let mut section = Section::new(m.source_file.as_str());
    for modifier in &m.modifiers {
        section.key(modifier.sound_name(), modifier.stringref.to_string());
    }
    section
}

/// 标量字段在补丁中的文本形式，结构、列表和本地化字符串返回 `None`
pub fn field_value(value: &GffValue) -> Option<String> {
    Some(match value {
        GffValue::UInt8(v) => v.to_string(),
        GffValue::Int8(v) => v.to_string(),
        GffValue::UInt16(v) => v.to_string(),
        GffValue::Int16(v) => v.to_string(),
        GffValue::UInt32(v) => v.to_string(),
        GffValue::Int32(v) => v.to_string(),
        GffValue::UInt64(v) => v.to_string(),
        GffValue::Int64(v) => v.to_string(),
        GffValue::Single(v) => v.to_string(),
        GffValue::Double(v) => v.to_string(),
        GffValue::String(v) => escape_text(v),
        GffValue::ResRef(v) => v.clone(),
        GffValue::Vector3(v) => join_floats(v),
        GffValue::Vector4(v) => join_floats(v),
        GffValue::LocString(_) | GffValue::Binary(_) | GffValue::Struct(_) | GffValue::List(_) => {
            return None;
        }
    })
}

fn join_floats(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("|")
}

/// INI 值不能跨行
pub fn escape_text(text: &str) -> String {
    text.replace("\r\n", "<#CR#><#LF#>")
        .replace('\n', "<#LF#>")
        .replace('\r', "<#CR#>")
}
