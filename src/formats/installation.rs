use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::resource::is_capsule_name;
use crate::utils::{FileEntry, find_child_case_insensitive, scan_directory};

/// 游戏根目录下的索引文件
pub const KEY_FILE: &str = "chitin.key";
pub const TALKTABLE_FILE: &str = "dialog.tlk";

/// 一个完整的游戏安装目录
///
/// 只记录根路径，目录内容在遍历时才读取。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    root: PathBuf,
}

impl Installation {
    pub fn is_installation(path: &Path) -> bool {
        path.is_dir() && find_child_case_insensitive(path, KEY_FILE).is_some_and(|p| p.is_file())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::PathNotFound(path.to_path_buf()));
        }
        if !Self::is_installation(path) {
            return Err(Error::invalid(
                "installation",
                format!("{:?} 下没有 {KEY_FILE}", path),
            ));
        }
        Ok(Self {
            root: path.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn override_path(&self) -> Option<PathBuf> {
        find_child_case_insensitive(&self.root, "Override").filter(|p| p.is_dir())
    }

    pub fn modules_path(&self) -> Option<PathBuf> {
        find_child_case_insensitive(&self.root, "Modules").filter(|p| p.is_dir())
    }

    pub fn talktable_path(&self) -> Option<PathBuf> {
        find_child_case_insensitive(&self.root, TALKTABLE_FILE).filter(|p| p.is_file())
    }

    /// override 目录下的所有文件，相对路径相对于 override 目录
    pub fn override_resources(&self) -> Result<Vec<FileEntry>> {
        match self.override_path() {
            Some(dir) => scan_directory(&dir),
            None => Ok(Vec::new()),
        }
    }

    /// modules 目录下的所有容器文件，按文件名排序
    pub fn module_files(&self) -> Result<Vec<PathBuf>> {
        let Some(dir) = self.modules_path() else {
            return Ok(Vec::new());
        };
        let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.is_file()
                    && p.file_name()
                        .is_some_and(|name| is_capsule_name(&name.to_string_lossy()))
            })
            .collect();
        // 同一模块的文件相邻，组内按加载顺序
        files.sort_by_key(|p| {
            let name = p
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            (module_root(&name), module_priority(&name), name)
        });
        Ok(files)
    }
}

/// 模块文件名对应的模块根名，例如 `danm13_s.rim` -> `danm13`
pub fn module_root(file_name: &str) -> String {
    let lower = file_name.to_lowercase();
    let stem = match lower.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => lower.as_str(),
    };
    let stem = stem.strip_suffix("_s").unwrap_or(stem);
    let stem = stem.strip_suffix("_dlg").unwrap_or(stem);
    stem.to_string()
}

/// 模块组内的加载顺序，数值小的优先
///
/// `.mod` 覆盖同名的 `.rim`，其后依次为 `_s.rim`、`_dlg.erf`，其余容器排在最后。
pub fn module_priority(file_name: &str) -> u8 {
    let lower = file_name.to_lowercase();
    if lower.ends_with(".mod") {
        0
    } else if lower.ends_with("_s.rim") {
        2
    } else if lower.ends_with(".rim") {
        1
    } else if lower.ends_with("_dlg.erf") {
        3
    } else {
        4
    }
}

/// 是否属于可以合并为一个 `.mod` 的模块文件
pub fn is_module_file(file_name: &str) -> bool {
    module_priority(file_name) < 4
}

/// `.rim` 模块组的成员文件名，按加载顺序
pub fn module_companions(root: &str) -> [String; 3] {
    [
        format!("{root}.rim"),
        format!("{root}_s.rim"),
        format!("{root}_dlg.erf"),
    ]
}

/// 模块资源的补丁目标：`.rim` 不能被补丁修改，统一写入同名 `.mod`
pub fn module_destination(file_name: &str) -> String {
    if is_module_file(file_name) {
        format!("modules\\{}.mod", module_root(file_name))
    } else {
        format!("modules\\{file_name}")
    }
}
