use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::formats::Installation;

/// 调用方给出的一个对比根
#[derive(Debug, Clone)]
pub enum RootInput {
    Path(PathBuf),
    /// 已加载的安装目录
    Installation(Installation),
}

impl From<PathBuf> for RootInput {
    fn from(path: PathBuf) -> Self {
        RootInput::Path(path)
    }
}

impl From<&Path> for RootInput {
    fn from(path: &Path) -> Self {
        RootInput::Path(path.to_path_buf())
    }
}

impl From<&str> for RootInput {
    fn from(path: &str) -> Self {
        RootInput::Path(PathBuf::from(path))
    }
}

impl From<Installation> for RootInput {
    fn from(installation: Installation) -> Self {
        RootInput::Installation(installation)
    }
}

impl RootInput {
    pub fn path(&self) -> &Path {
        match self {
            RootInput::Path(path) => path,
            RootInput::Installation(installation) => installation.root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathKind {
    Installation(Installation),
    Folder(PathBuf),
    File(PathBuf),
}

/// 一个已分类的对比根，创建后不再修改
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInfo {
    kind: PathKind,
    index: usize,
    name: String,
}

impl PathInfo {
    /// 分类输入，不修改文件系统
    ///
    /// 依次判断：已加载的安装目录、含索引文件的目录、普通目录、普通文件，
    /// 都不满足时返回 [`Error::PathNotFound`]。
    pub fn resolve(input: &RootInput, index: usize) -> Result<Self> {
        let kind = match input {
            RootInput::Installation(installation) => PathKind::Installation(installation.clone()),
            RootInput::Path(path) if Installation::is_installation(path) => {
                PathKind::Installation(Installation::load(path)?)
            }
            RootInput::Path(path) if path.is_dir() => PathKind::Folder(path.clone()),
            RootInput::Path(path) if path.is_file() => PathKind::File(path.clone()),
            RootInput::Path(path) => return Err(Error::PathNotFound(path.clone())),
        };

        let path = input.path();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self { kind, index, name })
    }

    pub fn kind(&self) -> &PathKind {
        &self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        match &self.kind {
            PathKind::Installation(installation) => installation.root(),
            PathKind::Folder(path) | PathKind::File(path) => path,
        }
    }

    pub fn is_installation(&self) -> bool {
        matches!(self.kind, PathKind::Installation(_))
    }
}

impl fmt::Display for PathInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            PathKind::Installation(_) => "安装目录",
            PathKind::Folder(_) => "目录",
            PathKind::File(_) => "文件",
        };
        write!(f, "[{}] {} ({})", self.index, self.name, kind)
    }
}
