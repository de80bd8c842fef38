//! 结构化修改记录
//!
//! 每种格式族对应 [`Modification`] 的一个变体，
//! 由格式分析器生成，由补丁写入器消费。

mod gff;
mod install;
mod ssf;
mod tlk;
mod twoda;

pub use gff::{ModificationsGff, ModifyGff};
pub use install::{InstallFile, InstallFolderMap};
pub use ssf::{ModificationsSsf, ModifySsf};
pub use tlk::{APPEND_TLK, ModificationsTlk, ModifyTlk};
pub use twoda::{Modifications2Da, Modify2Da};

/// 除字符串表外的默认安装目录
pub const DEFAULT_DESTINATION: &str = "Override";
/// 字符串表的默认安装目录 (游戏根目录)
pub const TLK_DESTINATION: &str = ".";

/// 修改种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModificationKind {
    TwoDa,
    Gff,
    Tlk,
    Ssf,
    Ncs,
}

impl ModificationKind {
    pub fn name(self) -> &'static str {
        match self {
            ModificationKind::TwoDa => "2DA",
            ModificationKind::Gff => "GFF",
            ModificationKind::Tlk => "TLK",
            ModificationKind::Ssf => "SSF",
            ModificationKind::Ncs => "NCS",
        }
    }
}

/// 编译脚本修改，目前只占位
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModificationsNcs {
    pub source_file: String,
    pub destination: Option<String>,
}

impl ModificationsNcs {
    pub fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            destination: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modification {
    TwoDa(Modifications2Da),
    Gff(ModificationsGff),
    Tlk(ModificationsTlk),
    Ssf(ModificationsSsf),
    Ncs(ModificationsNcs),
}

impl Modification {
    pub fn kind(&self) -> ModificationKind {
        match self {
            Modification::TwoDa(_) => ModificationKind::TwoDa,
            Modification::Gff(_) => ModificationKind::Gff,
            Modification::Tlk(_) => ModificationKind::Tlk,
            Modification::Ssf(_) => ModificationKind::Ssf,
            Modification::Ncs(_) => ModificationKind::Ncs,
        }
    }

    pub fn source_file(&self) -> &str {
        match self {
            Modification::TwoDa(m) => &m.source_file,
            Modification::Gff(m) => &m.source_file,
            Modification::Tlk(m) => &m.source_file,
            Modification::Ssf(m) => &m.source_file,
            Modification::Ncs(m) => &m.source_file,
        }
    }

    /// 判断是否已记录时使用的文件名
    ///
    /// 字符串表的源文件固定为 `append.tlk`，因此用被比较的表名区分。
    pub fn record_key(&self) -> &str {
        match self {
            Modification::Tlk(m) => &m.save_as,
            other => other.source_file(),
        }
    }

    /// 字符串表始终安装到游戏根目录，不受影响
    pub fn set_destination(&mut self, destination: impl Into<String>) {
        let destination = Some(destination.into());
        match self {
            Modification::TwoDa(m) => m.destination = destination,
            Modification::Gff(m) => m.destination = destination,
            Modification::Ssf(m) => m.destination = destination,
            Modification::Ncs(m) => m.destination = destination,
            Modification::Tlk(_) => {}
        }
    }

    /// 该修改需要安装的 (目录, 文件名)，不需要安装时为 `None`
    pub fn install_target(&self) -> Option<(String, String)> {
        fn resolve(destination: &Option<String>, default: &str, file: &str) -> (String, String) {
            let folder = destination
                .as_deref()
                .filter(|d| !d.is_empty())
                .unwrap_or(default);
            (folder.to_string(), file.to_string())
        }

        match self {
            Modification::TwoDa(m) => Some(resolve(
                &m.destination,
                DEFAULT_DESTINATION,
                m.save_as.as_deref().unwrap_or(&m.source_file),
            )),
            Modification::Gff(m) => Some(resolve(
                &m.destination,
                DEFAULT_DESTINATION,
                m.save_as.as_deref().unwrap_or(&m.source_file),
            )),
            Modification::Ssf(m) => Some(resolve(
                &m.destination,
                DEFAULT_DESTINATION,
                m.save_as.as_deref().unwrap_or(&m.source_file),
            )),
            Modification::Tlk(m) if m.has_appends() => {
                Some(resolve(&m.destination, TLK_DESTINATION, &m.source_file))
            }
            Modification::Tlk(_) | Modification::Ncs(_) => None,
        }
    }
}

/// 按格式族分组的修改累加器，只追加不删除
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModificationsByType {
    pub tlk: Vec<ModificationsTlk>,
    pub install: Vec<InstallFile>,
    pub twoda: Vec<Modifications2Da>,
    pub gff: Vec<ModificationsGff>,
    pub ssf: Vec<ModificationsSsf>,
    pub ncs: Vec<ModificationsNcs>,
}

impl ModificationsByType {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, modification: Modification) {
        match modification {
            Modification::TwoDa(m) => self.twoda.push(m),
            Modification::Gff(m) => self.gff.push(m),
            Modification::Tlk(m) => self.tlk.push(m),
            Modification::Ssf(m) => self.ssf.push(m),
            Modification::Ncs(m) => self.ncs.push(m),
        }
    }

    /// 是否已有相同记录键的同类修改
    pub fn contains(&self, modification: &Modification) -> bool {
        let key = modification.record_key();
        match modification {
            Modification::TwoDa(_) => self.twoda.iter().any(|m| m.source_file == key),
            Modification::Gff(_) => self.gff.iter().any(|m| m.source_file == key),
            Modification::Tlk(_) => self.tlk.iter().any(|m| m.save_as == key),
            Modification::Ssf(_) => self.ssf.iter().any(|m| m.source_file == key),
            Modification::Ncs(_) => self.ncs.iter().any(|m| m.source_file == key),
        }
    }

    /// 按种类依次遍历全部修改
    pub fn iter(&self) -> impl Iterator<Item = Modification> + '_ {
        let tlk = self.tlk.iter().cloned().map(Modification::Tlk);
        let twoda = self.twoda.iter().cloned().map(Modification::TwoDa);
        let gff = self.gff.iter().cloned().map(Modification::Gff);
        let ssf = self.ssf.iter().cloned().map(Modification::Ssf);
        let ncs = self.ncs.iter().cloned().map(Modification::Ncs);
        tlk.chain(twoda).chain(gff).chain(ssf).chain(ncs)
    }

    pub fn modification_count(&self) -> usize {
        self.tlk.len() + self.twoda.len() + self.gff.len() + self.ssf.len() + self.ncs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modification_count() == 0 && self.install.is_empty()
    }
}
