use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::formats::{
    Capsule, Gff, Ssf, Tlk, TlkEntry, TwoDa, is_module_file, module_companions, module_root,
};
use crate::mods::{APPEND_TLK, InstallFile, Modification, ModificationsByType, ModifyTlk};
use crate::resource::{file_name_of, is_capsule_name};
use crate::utils::resolve_case_insensitive;

/// 把补丁需要的资源文件写入输出目录根部
///
/// 目标目录只体现在补丁定义中，暂存文件本身从不放进子目录。
#[derive(Debug, Clone)]
pub struct PatchMaterializer {
    output_dir: PathBuf,
    base_data: Option<PathBuf>,
}

impl PatchMaterializer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            base_data: None,
        }
    }

    /// 找不到基础文件时到该目录中查找
    pub fn with_base_data(mut self, base_data: impl Into<PathBuf>) -> Self {
        self.base_data = Some(base_data.into());
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn staged_path(&self, file: &str) -> PathBuf {
        self.output_dir.join(file)
    }

    /// 在基础数据目录中查找某个安装目标的原始文件
    ///
    /// 依次尝试 `<root>/<folder>/<file>`、`<root>/Override/<file>`、
    /// `<root>/<file>`，最后是目标目录指向的容器内部。
    pub fn find_base(&self, folder: &str, file: &str) -> Option<Vec<u8>> {
        let root = self.base_data.as_deref()?;
        let folder = folder.replace('\\', "/");

        let candidates = [
            Path::new(&folder).join(file),
            Path::new("Override").join(file),
            PathBuf::from(file),
        ];
        for candidate in &candidates {
            if let Some(path) = resolve_case_insensitive(root, candidate)
                && path.is_file()
            {
                debug!("基础文件: {}", path.display());
                return fs::read(&path).ok();
            }
        }

        if !is_capsule_name(&folder) {
            return None;
        }
        // 目标 `.mod` 尚不存在时，到同一模块的 `.rim` 组中查找
        let folder = Path::new(&folder);
        let mut capsules = vec![folder.to_path_buf()];
        if let Some(name) = folder.file_name().map(|n| n.to_string_lossy().to_string())
            && is_module_file(&name)
        {
            let dir = folder.parent().unwrap_or(Path::new(""));
            capsules.extend(module_companions(&module_root(&name)).iter().map(|c| dir.join(c)));
        }
        for capsule in &capsules {
            let Some(capsule_path) = resolve_case_insensitive(root, capsule) else {
                continue;
            };
            match Capsule::open(&capsule_path) {
                Ok(capsule) => {
                    if let Some(resource) = capsule.get_by_name(file) {
                        debug!("基础文件: {}/{file}", capsule_path.display());
                        return Some(resource.data.to_vec());
                    }
                }
                Err(e) => warn!("无法打开容器 {}: {e}", capsule_path.display()),
            }
        }
        None
    }

    /// 暂存一个修改对应的完整基础文件，返回是否写出了文件
    ///
    /// `base` 为对比时基准根中的原始字节，缺省时到基础数据目录中查找。
    /// 已暂存过的文件不会重写。
    pub fn stage_modification(&self, modification: &Modification, base: Option<&[u8]>) -> Result<bool> {
        let Some((folder, file)) = modification.install_target() else {
            return Ok(false);
        };
        if let Modification::Tlk(_) | Modification::Ncs(_) = modification {
            return Ok(false);
        }

        let target = self.staged_path(&file);
        if target.exists() {
            return Ok(false);
        }

        let found;
        let base = match base {
            Some(base) => Some(base),
            None => {
                found = self.find_base(&folder, &file);
                found.as_deref()
            }
        };

        let bytes = match (modification, base) {
            (Modification::TwoDa(_), Some(data)) => TwoDa::parse(data)?.to_bytes()?,
            (Modification::Gff(_), Some(data)) => Gff::parse(data)?.to_bytes()?,
            (Modification::Ssf(_), Some(data)) => Ssf::parse(data)?.to_bytes()?,
            (Modification::Ssf(_), None) => {
                warn!("{file}: 找不到基础文件，生成空音效集");
                Ssf::default().to_bytes()?
            }
            (_, None) => {
                warn!("{file}: 找不到基础文件，安装时需要目标目录中已有该文件");
                return Ok(false);
            }
            (Modification::Tlk(_) | Modification::Ncs(_), Some(_)) => return Ok(false),
        };

        fs::write(&target, bytes)?;
        debug!("已暂存 {file}");
        Ok(true)
    }

    /// 按令牌顺序重写追加用字符串表
    pub fn write_append_tlk(&self, appends: &[ModifyTlk]) -> Result<()> {
        let mut sorted: Vec<&ModifyTlk> = appends.iter().filter(|m| !m.is_replacement).collect();
        sorted.sort_by_key(|m| m.token_id);

        let tlk = Tlk {
            language: 0,
            entries: sorted
                .iter()
                .map(|m| TlkEntry::new(m.text.clone(), m.sound.clone()))
                .collect(),
        };
        fs::write(self.staged_path(APPEND_TLK), tlk.to_bytes()?)?;
        Ok(())
    }

    /// 暂存一个整体安装的文件，返回是否写出了文件
    pub fn stage_install_file(&self, install: &InstallFile, data: Option<&[u8]>) -> Result<bool> {
        let (folder, file) = install.install_target();
        let target = self.staged_path(&file);
        if target.exists() {
            return Ok(false);
        }

        let bytes = match data {
            Some(data) => data.to_vec(),
            None => match self.find_base(&folder, &file) {
                Some(data) => data,
                None => {
                    warn!("{}: 找不到要安装的文件内容", install.source_file);
                    return Ok(false);
                }
            },
        };
        fs::write(&target, bytes)?;
        Ok(true)
    }

    /// 根据完整的累加器一次性暂存全部文件，返回写出的文件数
    ///
    /// 只使用基础数据目录；单个文件失败只记录警告。
    pub fn generate_all_files(&self, modifications: &ModificationsByType) -> Result<usize> {
        fs::create_dir_all(&self.output_dir)?;
        let mut written = 0;

        let appends: Vec<ModifyTlk> = modifications
            .tlk
            .iter()
            .flat_map(|m| m.modifiers.iter().cloned())
            .collect();
        if !appends.is_empty() {
            self.write_append_tlk(&appends)?;
            written += 1;
        }

        for modification in modifications.iter() {
            match self.stage_modification(&modification, None) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => warn!("{}: 暂存失败: {e}", modification.source_file()),
            }
        }
        for install in &modifications.install {
            match self.stage_install_file(install, None) {
                Ok(true) => written += 1,
                Ok(false) => {}
                Err(e) => warn!("{}: 暂存失败: {e}", file_name_of(&install.source_file)),
            }
        }

        info!("已暂存 {written} 个文件到 {}", self.output_dir.display());
        Ok(written)
    }
}
