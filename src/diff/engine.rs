use bytes::Bytes;
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::analyzers::get_analyzer;
use super::path_info::{PathInfo, RootInput};
use super::path_info::PathKind;
use super::walker::{walk, walk_composite};
use crate::config::DiffConfig;
use crate::error::{Error, Result};
use crate::formats::{
    Capsule, CapsuleKind, TALKTABLE_FILE, module_companions, module_destination, module_root,
};
use crate::mods::{DEFAULT_DESTINATION, InstallFile, Modification, ModificationsByType, TLK_DESTINATION};
use crate::resource::{
    ComparableResource, DiffContext, file_name_of, is_capsule_extension, is_capsule_name,
    split_resource_name,
};
use crate::tslpatch::IncrementalPatchWriter;
use crate::utils::{
    compute_hash, decode_text, is_text_content, render_binary_diff, render_text_diff,
    text_lines_equal,
};

/// 差异文本使用的日志目标，输出模式只按它放行差异内容
pub const DIFF_OUTPUT_TARGET: &str = "kotordiff::diff_output";

/// 只做哈希比较的二进制格式
pub const BINARY_FORMATS: &[&str] = &[
    "ncs", "mdl", "mdx", "wok", "pwk", "dwk", "bwm", "tga", "tpc", "dds", "bmp", "wav", "mp3",
    "bik", "lip", "erf", "mod", "rim", "sav", "bif", "key", "txb", "plt",
];

pub fn is_binary_format(format_tag: &str) -> bool {
    BINARY_FORMATS.contains(&format_tag.to_ascii_lowercase().as_str())
}

/// 一次对比运行的三态结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiffOutcome {
    #[default]
    Identical,
    Different,
    /// 运行未能完成
    Indeterminate,
}

impl DiffOutcome {
    pub fn as_option(self) -> Option<bool> {
        match self {
            DiffOutcome::Identical => Some(true),
            DiffOutcome::Different => Some(false),
            DiffOutcome::Indeterminate => None,
        }
    }
}

/// 不同但没有结构化修改的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffReason {
    Text,
    Hash,
    /// 分析失败或差异无法写入补丁
    Unrepresentable,
}

/// 单对资源的比较结果
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceDiff {
    Identical,
    Structured(Modification),
    Different(DiffReason),
}

/// 只存在于某一个根中的资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniqueResource {
    pub identifier: String,
    pub root_index: usize,
    pub install: InstallFile,
}

#[derive(Debug, Clone, Default)]
pub struct DiffReport {
    pub outcome: DiffOutcome,
    pub modifications: ModificationsByType,
    pub uniques: Vec<UniqueResource>,
    /// 存在差异的资源位置
    pub different: Vec<String>,
    /// 已处理的资源组数量
    pub groups: usize,
}

impl DiffReport {
    fn mark_different(&mut self) {
        if self.outcome == DiffOutcome::Identical {
            self.outcome = DiffOutcome::Different;
        }
    }
}

/// 协作式取消标记，在每个资源组之间检查
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 容器内的一个资源
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapsuleEntry {
    pub name: String,
    pub data: Bytes,
}

/// 两个容器按 resref 逐一比较的结果
#[derive(Debug, Clone, Default)]
pub struct CapsuleComparison {
    /// 两边都有且内容不同的资源名 (小写)
    pub differing: Vec<String>,
    /// 结构化修改及其基础数据
    pub modifications: Vec<(Modification, Bytes)>,
    pub only_in_a: Vec<CapsuleEntry>,
    pub only_in_b: Vec<CapsuleEntry>,
}

impl CapsuleComparison {
    pub fn is_identical(&self) -> bool {
        self.differing.is_empty() && self.only_in_a.is_empty() && self.only_in_b.is_empty()
    }
}

/// n 路资源对比
pub struct DiffEngine {
    config: DiffConfig,
    filters: Vec<String>,
    cancel: CancelToken,
}

impl DiffEngine {
    pub fn new(config: DiffConfig) -> Self {
        Self {
            config,
            filters: Vec::new(),
            cancel: CancelToken::new(),
        }
    }

    /// 只比较文件名、模块根名或路径后缀匹配的资源
    pub fn with_filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters
            .into_iter()
            .map(|f| f.replace('\\', "/").trim_matches('/').to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        self
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &DiffConfig {
        &self.config
    }

    /// 对比所有根，出错时返回 `None`
    pub fn compare(
        &self,
        roots: &[RootInput],
        writer: Option<&mut IncrementalPatchWriter>,
    ) -> Option<bool> {
        match self.run(roots, writer) {
            Ok(report) => report.outcome.as_option(),
            Err(e) => {
                error!("对比失败: {e}");
                None
            }
        }
    }

    /// 对比所有根并返回完整报告
    ///
    /// 任一根不存在时在收集资源之前返回错误。
    pub fn run(
        &self,
        roots: &[RootInput],
        mut writer: Option<&mut IncrementalPatchWriter>,
    ) -> Result<DiffReport> {
        for root in roots {
            let path = root.path();
            if !path.exists() {
                return Err(Error::PathNotFound(path.to_path_buf()));
            }
        }
        let infos = roots
            .iter()
            .enumerate()
            .map(|(index, root)| PathInfo::resolve(root, index))
            .collect::<Result<Vec<_>>>()?;
        for info in &infos {
            info!("对比根 {info}");
        }

        let composite = uses_composite_modules(&infos);
        let mut groups: ResourceGroups = BTreeMap::new();
        for info in &infos {
            let walker = if composite && is_module_rim_root(info) {
                walk_composite(info)
            } else {
                walk(info)
            };
            for resource in walker {
                if !self.matches_filters(&resource.identifier) {
                    continue;
                }
                // 同一根内重复的标识符只保留第一个
                groups
                    .entry(resource.identifier.to_lowercase())
                    .or_default()
                    .entry(info.index())
                    .or_insert(resource);
            }
        }
        merge_module_sets(&mut groups);

        let total = groups.len();
        info!("共收集到 {total} 个资源组");

        let mut report = DiffReport::default();
        let log_every = self.config.log_every.max(1);
        for group in groups.into_values() {
            if self.cancel.is_cancelled() {
                warn!("对比已取消，已处理 {}/{total} 个资源组", report.groups);
                report.outcome = DiffOutcome::Indeterminate;
                return Ok(report);
            }

            self.process_group(&infos, group, &mut report, writer.as_deref_mut())?;
            report.groups += 1;
            if report.groups % log_every == 0 {
                info!("已处理 {}/{total} 个资源组", report.groups);
            }
        }

        info!(
            "对比完成: {} 个资源组, {} 处差异, {} 个独有资源",
            report.groups,
            report.different.len(),
            report.uniques.len()
        );
        Ok(report)
    }

    fn process_group(
        &self,
        infos: &[PathInfo],
        group: BTreeMap<usize, ComparableResource>,
        report: &mut DiffReport,
        mut writer: Option<&mut IncrementalPatchWriter>,
    ) -> Result<()> {
        let mut occurrences = group.into_values();
        let Some(base) = occurrences.next() else {
            return Ok(());
        };
        let others: Vec<ComparableResource> = occurrences.collect();

        if others.is_empty() {
            let root_name = infos
                .get(base.source_index)
                .map(PathInfo::name)
                .unwrap_or("?");
            info!(target: DIFF_OUTPUT_TARGET, "仅存在于 {root_name}: {}", base.identifier);
            let install = InstallFile::new(base.identifier.clone(), Some(resource_destination(&base)));
            return self.record_unique(report, writer, &base.identifier, base.source_index, install, &base.data);
        }

        for other in &others {
            let ctx = DiffContext::new(
                base.identifier.clone(),
                other.identifier.clone(),
                base.format_tag.clone(),
            );

            if is_capsule_extension(&base.format_tag) && base.data != other.data {
                match self.compare_capsules(&base.data, &other.data, &base.identifier) {
                    Ok(comparison) => {
                        self.apply_capsule_comparison(
                            &base,
                            other,
                            comparison,
                            report,
                            writer.as_deref_mut(),
                        )?;
                        continue;
                    }
                    Err(e) => warn!("{}: 无法按容器比较，改为字节比较: {e}", ctx.location_label()),
                }
            }

            match self.diff_data(&base.data, &other.data, &ctx) {
                ResourceDiff::Identical => debug!("相同: {}", ctx.location_label()),
                ResourceDiff::Structured(mut modification) => {
                    let destination = resource_destination(&base);
                    if destination != DEFAULT_DESTINATION {
                        modification.set_destination(destination);
                    }
                    self.record_modification(
                        report,
                        writer.as_deref_mut(),
                        &ctx.location_label(),
                        modification,
                        &base.data,
                    )?;
                }
                ResourceDiff::Different(reason) => {
                    info!("{}: 内容不同 ({reason:?})", ctx.location_label());
                    report.different.push(ctx.location_label());
                    report.mark_different();
                }
            }
        }
        Ok(())
    }

    fn record_modification(
        &self,
        report: &mut DiffReport,
        writer: Option<&mut IncrementalPatchWriter>,
        location: &str,
        modification: Modification,
        base: &[u8],
    ) -> Result<()> {
        info!("{location}: 生成 {} 修改", modification.kind().name());
        report.different.push(location.to_string());
        report.mark_different();

        if let Some(writer) = writer {
            writer.add_modification_with_base(&modification, Some(base))?;
        }
        if !report.modifications.contains(&modification) {
            report.modifications.push(modification);
        }
        Ok(())
    }

    fn record_unique(
        &self,
        report: &mut DiffReport,
        writer: Option<&mut IncrementalPatchWriter>,
        identifier: &str,
        root_index: usize,
        install: InstallFile,
        data: &[u8],
    ) -> Result<()> {
        report.mark_different();
        if let Some(writer) = writer {
            writer.add_install_file(&install, Some(data))?;
        }
        let target = install.install_target();
        if !report
            .modifications
            .install
            .iter()
            .any(|i| i.install_target() == target)
        {
            report.modifications.install.push(install.clone());
        }
        report.uniques.push(UniqueResource {
            identifier: identifier.to_string(),
            root_index,
            install,
        });
        Ok(())
    }

    fn apply_capsule_comparison(
        &self,
        base: &ComparableResource,
        other: &ComparableResource,
        comparison: CapsuleComparison,
        report: &mut DiffReport,
        mut writer: Option<&mut IncrementalPatchWriter>,
    ) -> Result<()> {
        let destination = base
            .destination
            .clone()
            .unwrap_or_else(|| capsule_destination(&base.identifier));

        for name in &comparison.differing {
            if !comparison
                .modifications
                .iter()
                .any(|(m, _)| m.source_file().eq_ignore_ascii_case(name))
            {
                let location = format!("{}/{name}", base.identifier);
                info!("{location}: 内容不同");
                report.different.push(location);
                report.mark_different();
            }
        }

        for (mut modification, base_data) in comparison.modifications {
            modification.set_destination(destination.clone());
            let location = format!("{}/{}", base.identifier, modification.source_file());
            self.record_modification(report, writer.as_deref_mut(), &location, modification, &base_data)?;
        }

        let uniques = comparison
            .only_in_a
            .into_iter()
            .map(|entry| (entry, base.source_index))
            .chain(comparison.only_in_b.into_iter().map(|entry| (entry, other.source_index)));
        for (entry, root_index) in uniques {
            let identifier = format!("{}/{}", base.identifier, entry.name);
            info!(target: DIFF_OUTPUT_TARGET, "仅存在于第 {root_index} 个根的容器中: {identifier}");
            let install = InstallFile::new(entry.name.clone(), Some(destination.clone()));
            self.record_unique(report, writer.as_deref_mut(), &identifier, root_index, install, &entry.data)?;
        }
        Ok(())
    }

    /// 比较一对资源的字节内容
    ///
    /// 字节相同直接判定相同；已知格式交给分析器；
    /// 非二进制格式且都像文本时逐行比较；其余做哈希比较。
    pub fn diff_data(&self, a: &[u8], b: &[u8], ctx: &DiffContext) -> ResourceDiff {
        if a == b {
            return ResourceDiff::Identical;
        }

        let location = ctx.location_label();
        if let Some(analyzer) = get_analyzer(&ctx.ext) {
            return match analyzer.analyze(a, b, &location) {
                Ok(None) => ResourceDiff::Identical,
                Ok(Some(modification)) => ResourceDiff::Structured(modification),
                Err(e) => {
                    warn!("{location}: {} 分析失败: {e}", analyzer.name());
                    ResourceDiff::Different(DiffReason::Unrepresentable)
                }
            };
        }

        if !is_binary_format(&ctx.ext) && is_text_content(a) && is_text_content(b) {
            let text_a = decode_text(a);
            let text_b = decode_text(b);
            if text_lines_equal(&text_a, &text_b) {
                return ResourceDiff::Identical;
            }
            info!(
                target: DIFF_OUTPUT_TARGET,
                "{}",
                render_text_diff(self.config.diff_format, &text_a, &text_b, &ctx.label_a(), &ctx.label_b())
            );
            return ResourceDiff::Different(DiffReason::Text);
        }

        if !self.config.compare_hashes {
            debug!("{location}: 已关闭哈希比较，视为相同");
            return ResourceDiff::Identical;
        }
        let hash_a = compute_hash(a);
        let hash_b = compute_hash(b);
        if hash_a == hash_b {
            ResourceDiff::Identical
        } else {
            debug!("{location}: SHA256 {hash_a} != {hash_b}");
            info!(
                target: DIFF_OUTPUT_TARGET,
                "{}",
                render_binary_diff(self.config.diff_format, &ctx.label_a(), &ctx.label_b(), a.len(), b.len())
            );
            ResourceDiff::Different(DiffReason::Hash)
        }
    }

    /// 按 resref 逐一比较两个容器
    pub fn compare_capsules(&self, a: &[u8], b: &[u8], container: &str) -> Result<CapsuleComparison> {
        let capsule_a = Capsule::parse(a)?;
        let capsule_b = Capsule::parse(b)?;

        let index = |capsule: &Capsule| -> BTreeMap<String, CapsuleEntry> {
            capsule
                .resources()
                .iter()
                .map(|r| {
                    let name = r.file_name();
                    (
                        name.to_lowercase(),
                        CapsuleEntry {
                            name,
                            data: r.data.clone(),
                        },
                    )
                })
                .collect()
        };
        let entries_a = index(&capsule_a);
        let mut entries_b = index(&capsule_b);

        let mut comparison = CapsuleComparison::default();
        for (key, entry_a) in entries_a {
            let Some(entry_b) = entries_b.remove(&key) else {
                comparison.only_in_a.push(entry_a);
                continue;
            };
            let (resref, ext) = split_resource_name(&entry_a.name);
            let ctx = DiffContext::new(container, container, ext).with_resref(resref);
            match self.diff_data(&entry_a.data, &entry_b.data, &ctx) {
                ResourceDiff::Identical => {}
                ResourceDiff::Structured(modification) => {
                    comparison.differing.push(key);
                    comparison.modifications.push((modification, entry_a.data));
                }
                ResourceDiff::Different(_) => comparison.differing.push(key),
            }
        }
        comparison.only_in_b = entries_b.into_values().collect();
        Ok(comparison)
    }

    fn matches_filters(&self, identifier: &str) -> bool {
        if self.filters.is_empty() {
            return true;
        }
        let identifier = identifier.to_lowercase();
        let parts: Vec<&str> = identifier.split('/').collect();
        self.filters.iter().any(|filter| {
            identifier == *filter
                || identifier.ends_with(&format!("/{filter}"))
                || parts
                    .iter()
                    .any(|part| *part == filter.as_str() || (is_capsule_name(part) && module_root(part) == *filter))
        })
    }
}

type ResourceGroups = BTreeMap<String, BTreeMap<usize, ComparableResource>>;

/// 根中同时有 `.rim` 文件和 `.mod` 文件时，`.rim` 按整个模块组展开
fn uses_composite_modules(infos: &[PathInfo]) -> bool {
    infos.iter().any(|info| root_file_name(info).is_some_and(|n| n.ends_with(".mod")))
        && infos.iter().any(is_module_rim_root)
}

fn root_file_name(info: &PathInfo) -> Option<String> {
    match info.kind() {
        PathKind::File(path) => path.file_name().map(|n| n.to_string_lossy().to_lowercase()),
        _ => None,
    }
}

/// `rims` 目录中的 `.rim` 是独立资源包，不属于模块
fn is_module_rim_root(info: &PathInfo) -> bool {
    let Some(name) = root_file_name(info) else {
        return false;
    };
    let in_rims = info
        .path()
        .parent()
        .and_then(|p| p.file_name())
        .is_some_and(|n| n.eq_ignore_ascii_case("rims"));
    name.ends_with(".rim") && !name.ends_with("_s.rim") && !in_rims
}

/// 目录中的 `.rim` 模块组与另一个根中同名的 `.mod` 对比
///
/// 某个根只有 `.rim`、`_s.rim`、`_dlg.erf` 而没有 `.mod` 时，把这些文件按加载顺序
/// 合并为一个 `.mod` 放入 `.mod` 所在的资源组，原来的成员不再单独比较。
fn merge_module_sets(groups: &mut ResourceGroups) {
    let mod_keys: Vec<String> = groups
        .keys()
        .filter(|key| key.ends_with(".mod"))
        .cloned()
        .collect();

    for mod_key in mod_keys {
        let (dir, file) = match mod_key.rsplit_once('/') {
            Some((dir, file)) => (format!("{dir}/"), file.to_string()),
            None => (String::new(), mod_key.clone()),
        };
        let member_keys: Vec<String> = module_companions(&module_root(&file))
            .iter()
            .map(|name| format!("{dir}{name}"))
            .collect();

        let Some(mod_group) = groups.get(&mod_key) else {
            continue;
        };
        let identifier = mod_group
            .values()
            .next()
            .map(|r| r.identifier.clone())
            .unwrap_or_else(|| mod_key.clone());
        let mut missing: Vec<usize> = member_keys
            .iter()
            .filter_map(|key| groups.get(key))
            .flat_map(|group| group.keys().copied())
            .filter(|index| !mod_group.contains_key(index))
            .collect();
        missing.sort_unstable();
        missing.dedup();

        for index in missing {
            let parts: Vec<ComparableResource> = member_keys
                .iter()
                .filter_map(|key| groups.get_mut(key).and_then(|group| group.remove(&index)))
                .collect();
            match merge_capsules(&parts) {
                Ok(bytes) => {
                    debug!("合并 {} 个模块文件为 {identifier} (第 {index} 个根)", parts.len());
                    let merged = ComparableResource::new(identifier.clone(), bytes, index)
                        .with_destination(module_destination(&file));
                    groups.entry(mod_key.clone()).or_default().insert(index, merged);
                }
                Err(e) => {
                    warn!("无法合并模块 {file} (第 {index} 个根): {e}");
                    for part in parts {
                        groups
                            .entry(part.identifier.to_lowercase())
                            .or_default()
                            .insert(index, part);
                    }
                }
            }
        }
        for key in &member_keys {
            if groups.get(key).is_some_and(BTreeMap::is_empty) {
                groups.remove(key);
            }
        }
    }
}

/// 按顺序合并容器，同名资源保留先出现的
fn merge_capsules(parts: &[ComparableResource]) -> Result<Vec<u8>> {
    let mut merged = Capsule::new(CapsuleKind::Mod);
    for part in parts {
        for resource in Capsule::parse(&part.data)?.resources() {
            merged.push(resource.resref.clone(), resource.ext.clone(), resource.data.clone());
        }
    }
    merged.to_bytes()
}

/// 资源自带的目标优先，否则由标识符推断
fn resource_destination(resource: &ComparableResource) -> String {
    resource
        .destination
        .clone()
        .unwrap_or_else(|| destination_for(&resource.identifier))
}

/// 由资源标识符推断整体安装时的目标目录
pub fn destination_for(identifier: &str) -> String {
    if identifier.eq_ignore_ascii_case(TALKTABLE_FILE) {
        return TLK_DESTINATION.to_string();
    }
    let parts: Vec<&str> = identifier.split('/').collect();
    if parts.len() < 2 {
        return DEFAULT_DESTINATION.to_string();
    }
    match parts[0].to_ascii_lowercase().as_str() {
        "modules" if parts.len() >= 3 && is_capsule_name(parts[1]) => module_destination(parts[1]),
        "modules" => "modules".to_string(),
        "lips" => "Lips".to_string(),
        "streamwaves" | "streamvoice" => "StreamWaves".to_string(),
        _ => DEFAULT_DESTINATION.to_string(),
    }
}

/// 容器内资源的安装目标，即该容器本身；模块文件统一写入同名 `.mod`
pub fn capsule_destination(container: &str) -> String {
    module_destination(file_name_of(container))
}
