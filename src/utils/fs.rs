use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::error::Result;

/// 目录中的一个文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// 相对于扫描根目录的路径，统一使用 `/`
    pub relative: String,
    pub path: PathBuf,
}

/// 获取目录下所有文件的相对路径，按相对路径字典序排列
pub fn scan_directory(dir: &Path) -> Result<Vec<FileEntry>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let Ok(relative) = path.strip_prefix(dir) else {
            continue;
        };
        let relative = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push(FileEntry {
            relative,
            path: path.to_path_buf(),
        });
    }

    files.sort_by(|a, b| a.relative.cmp(&b.relative));
    Ok(files)
}

/// 在目录中按不区分大小写的文件名查找子项
pub fn find_child_case_insensitive(dir: &Path, name: &str) -> Option<PathBuf> {
    let exact = dir.join(name);
    if exact.exists() {
        return Some(exact);
    }

    fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .find(|e| e.file_name().to_string_lossy().eq_ignore_ascii_case(name))
        .map(|e| e.path())
}

/// 逐段解析大小写任意的相对路径，返回最接近的已存在路径
pub fn resolve_case_insensitive(base: &Path, relative: &Path) -> Option<PathBuf> {
    let mut current = base.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                current = find_child_case_insensitive(&current, &part.to_string_lossy())?;
            }
            Component::CurDir => {}
            _ => return None,
        }
    }
    Some(current)
}
