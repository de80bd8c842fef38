use std::collections::{BTreeMap, BTreeSet};

use super::DEFAULT_DESTINATION;
use crate::resource::file_name_of;

/// 整体安装的文件 (只存在于某一个根中的资源)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallFile {
    /// 资源标识符或文件名
    pub source_file: String,
    pub destination: Option<String>,
    pub save_as: Option<String>,
}

impl InstallFile {
    pub fn new(source_file: impl Into<String>, destination: Option<String>) -> Self {
        Self {
            source_file: source_file.into(),
            destination,
            save_as: None,
        }
    }

    /// 安装到的 (目录, 文件名)
    pub fn install_target(&self) -> (String, String) {
        let folder = self
            .destination
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DESTINATION);
        let file = self
            .save_as
            .as_deref()
            .unwrap_or_else(|| file_name_of(&self.source_file));
        (folder.to_string(), file.to_string())
    }
}

/// 安装目录到文件名列表的映射
///
/// 目录保持首次出现的顺序，目录名与文件名都不区分大小写去重。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallFolderMap {
    folders: Vec<(String, Vec<String>)>,
}

impl InstallFolderMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回是否新增了条目
    pub fn add(&mut self, folder: &str, file: &str) -> bool {
        let index = match self
            .folders
            .iter()
            .position(|(f, _)| f.eq_ignore_ascii_case(folder))
        {
            Some(index) => index,
            None => {
                self.folders.push((folder.to_string(), Vec::new()));
                self.folders.len() - 1
            }
        };

        let files = &mut self.folders[index].1;
        if files.iter().any(|f| f.eq_ignore_ascii_case(file)) {
            return false;
        }
        files.push(file.to_string());
        true
    }

    pub fn folders(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.folders.iter().map(|(f, files)| (f.as_str(), files.as_slice()))
    }

    pub fn files_in(&self, folder: &str) -> Option<&[String]> {
        self.folders
            .iter()
            .find(|(f, _)| f.eq_ignore_ascii_case(folder))
            .map(|(_, files)| files.as_slice())
    }

    pub fn folder_count(&self) -> usize {
        self.folders.len()
    }

    pub fn file_count(&self) -> usize {
        self.folders.iter().map(|(_, files)| files.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// 目录到文件集合是否一致，忽略顺序与大小写
    pub fn same_entries(&self, other: &InstallFolderMap) -> bool {
        fn normalized(map: &InstallFolderMap) -> BTreeMap<String, BTreeSet<String>> {
            let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
            for (folder, files) in map.folders() {
                out.entry(folder.to_lowercase())
                    .or_default()
                    .extend(files.iter().map(|f| f.to_lowercase()));
            }
            out
        }
        normalized(self) == normalized(other)
    }
}
