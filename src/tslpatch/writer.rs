use log::{debug, info, warn};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use super::ini::{IniHeader, render_ini};
use super::materialize::PatchMaterializer;
use crate::config::DiffConfig;
use crate::error::Result;
use crate::mods::{
    APPEND_TLK, InstallFile, InstallFolderMap, Modification, ModificationKind,
    ModificationsByType, ModifyTlk, TLK_DESTINATION,
};

/// 补丁定义中的列表段
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum IniSection {
    Tlk,
    Install,
    TwoDa,
    Gff,
    Compile,
    Ssf,
}

impl IniSection {
    fn of(kind: ModificationKind) -> Self {
        match kind {
            ModificationKind::Tlk => IniSection::Tlk,
            ModificationKind::TwoDa => IniSection::TwoDa,
            ModificationKind::Gff => IniSection::Gff,
            ModificationKind::Ssf => IniSection::Ssf,
            ModificationKind::Ncs => IniSection::Compile,
        }
    }
}

/// 写入器结束时的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriterSummary {
    pub tlk: usize,
    pub twoda: usize,
    pub gff: usize,
    pub ssf: usize,
    pub ncs: usize,
    pub install_files: usize,
    pub install_folders: usize,
}

impl WriterSummary {
    pub fn modification_count(&self) -> usize {
        self.tlk + self.twoda + self.gff + self.ssf + self.ncs
    }
}

impl fmt::Display for WriterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TLK: {}, 2DA: {}, GFF: {}, SSF: {}, NCS: {}, 安装文件: {} 个 (共 {} 个目录)",
            self.tlk,
            self.twoda,
            self.gff,
            self.ssf,
            self.ncs,
            self.install_files,
            self.install_folders
        )
    }
}

/// 增量补丁写入器
///
/// 一次运行对应一个实例。构造时写出补丁定义骨架，之后每条修改
/// 只在内存中记录并标记所属段落，累计到批量阈值或显式刷新时才重写整个文件。
/// 同种类、同文件名的修改只记录第一次。
pub struct IncrementalPatchWriter {
    ini_path: PathBuf,
    header: IniHeader,
    batch_size: usize,
    materializer: PatchMaterializer,
    modifications: ModificationsByType,
    folders: InstallFolderMap,
    recorded: HashSet<(ModificationKind, String)>,
    pending: BTreeSet<IniSection>,
    pending_writes: usize,
    next_token: usize,
    tlk_appends: Vec<ModifyTlk>,
}

impl IncrementalPatchWriter {
    /// 创建输出目录并写出骨架
    pub fn new(output_dir: impl Into<PathBuf>, config: &DiffConfig) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;

        let writer = Self {
            ini_path: output_dir.join(&config.ini_filename),
            header: IniHeader::new(config),
            batch_size: config.batch_size.max(1),
            materializer: PatchMaterializer::new(output_dir),
            modifications: ModificationsByType::new(),
            folders: InstallFolderMap::new(),
            recorded: HashSet::new(),
            pending: BTreeSet::new(),
            pending_writes: 0,
            next_token: 0,
            tlk_appends: Vec::new(),
        };
        writer.write_ini()?;
        info!("补丁定义骨架已写入 {}", writer.ini_path.display());
        Ok(writer)
    }

    /// 暂存基础文件时额外查找的游戏数据目录
    pub fn with_base_data(mut self, base_data: impl Into<PathBuf>) -> Self {
        self.materializer = self.materializer.with_base_data(base_data);
        self
    }

    /// 固定文件头中的日期
    pub fn with_date(mut self, date: impl Into<String>) -> Result<Self> {
        self.header = self.header.with_date(date);
        self.write_ini()?;
        Ok(self)
    }

    pub fn ini_path(&self) -> &Path {
        &self.ini_path
    }

    pub fn output_dir(&self) -> &Path {
        self.materializer.output_dir()
    }

    pub fn modifications(&self) -> &ModificationsByType {
        &self.modifications
    }

    pub fn install_folders(&self) -> &InstallFolderMap {
        &self.folders
    }

    pub fn add_modification(&mut self, modification: &Modification) -> Result<()> {
        self.add_modification_with_base(modification, None)
    }

    /// 记录一条修改；`base` 为对比基准中该资源的原始字节
    pub fn add_modification_with_base(
        &mut self,
        modification: &Modification,
        base: Option<&[u8]>,
    ) -> Result<()> {
        let key = (
            modification.kind(),
            modification.record_key().to_lowercase(),
        );
        if self.recorded.contains(&key) {
            debug!(
                "{} {} 已记录，跳过",
                modification.kind().name(),
                modification.record_key()
            );
            return Ok(());
        }

        let modification = match modification {
            Modification::Tlk(m) => {
                let mut m = m.clone();
                for modifier in &mut m.modifiers {
                    modifier.token_id = self.next_token;
                    self.next_token += 1;
                }
                self.tlk_appends.extend(m.modifiers.iter().cloned());
                if m.has_appends() {
                    self.materializer.write_append_tlk(&self.tlk_appends)?;
                }
                Modification::Tlk(m)
            }
            Modification::Ncs(m) => {
                warn!("{}: 暂不支持编译脚本修改", m.source_file);
                modification.clone()
            }
            other => {
                if let Err(e) = self.materializer.stage_modification(other, base) {
                    warn!("{}: 暂存基础文件失败: {e}", other.source_file());
                }
                other.clone()
            }
        };

        if let Some((folder, file)) = modification.install_target()
            && self.folders.add(&folder, &file)
        {
            self.pending.insert(IniSection::Install);
        }
        self.recorded.insert(key);
        self.pending.insert(IniSection::of(modification.kind()));
        self.modifications.push(modification);
        self.bump()
    }

    /// 记录一个整体安装的文件；`data` 为文件内容
    pub fn add_install_file(&mut self, install: &InstallFile, data: Option<&[u8]>) -> Result<()> {
        let (folder, file) = install.install_target();
        if !self.folders.add(&folder, &file) {
            debug!("{folder}\\{file} 已记录，跳过");
            return Ok(());
        }

        if let Err(e) = self.materializer.stage_install_file(install, data) {
            warn!("{}: 暂存安装文件失败: {e}", install.source_file);
        }
        self.modifications.install.push(install.clone());
        self.pending.insert(IniSection::Install);
        self.bump()
    }

    fn bump(&mut self) -> Result<()> {
        self.pending_writes += 1;
        if self.pending_writes >= self.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    /// 有待写入的段落时重写补丁定义文件
    pub fn flush(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }
        debug!("刷新 {} 个段落: {:?}", self.pending.len(), self.pending);
        self.write_ini()?;
        self.pending.clear();
        self.pending_writes = 0;
        Ok(())
    }

    /// 当前完整的补丁定义文本
    pub fn render_ini(&self) -> String {
        render_ini(&self.header, &self.modifications, &self.folders)
    }

    fn write_ini(&self) -> Result<()> {
        fs::write(&self.ini_path, self.render_ini())?;
        Ok(())
    }

    /// 写出剩余内容并返回统计
    pub fn finalize(&mut self) -> Result<WriterSummary> {
        self.flush()?;

        let summary = WriterSummary {
            tlk: self.modifications.tlk.len(),
            twoda: self.modifications.twoda.len(),
            gff: self.modifications.gff.len(),
            ssf: self.modifications.ssf.len(),
            ncs: self.modifications.ncs.len(),
            install_files: self.folders.file_count(),
            install_folders: self.folders.folder_count(),
        };
        info!("补丁已生成: {}", self.ini_path.display());
        info!("  {summary}");
        if self.tlk_appends.iter().any(|m| !m.is_replacement) {
            info!(
                "  {APPEND_TLK}: {} 个追加条目 (安装到 {TLK_DESTINATION})",
                self.tlk_appends.len()
            );
        }
        Ok(summary)
    }
}
