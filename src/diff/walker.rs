use bytes::Bytes;
use log::{debug, error};
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;

use super::path_info::{PathInfo, PathKind};
use crate::formats::{
    Capsule, Installation, TALKTABLE_FILE, is_module_file, module_companions, module_destination,
    module_root,
};
use crate::mods::DEFAULT_DESTINATION;
use crate::resource::{ComparableResource, is_capsule_name};
use crate::utils::{find_child_case_insensitive, scan_directory};


/// 待处理的来源
#[derive(Debug)]
enum Pending {
    /// 单个松散文件
    File {
        identifier: String,
        path: PathBuf,
        destination: Option<String>,
    },
    /// 容器文件，`prefix` 为其内部资源标识符的前缀
    Capsule {
        prefix: String,
        path: PathBuf,
        destination: Option<String>,
    },
}

/// 把一个对比根展开为资源序列
///
/// 只保存待处理来源的队列，同一时间最多只有一个容器的内容在内存中。
/// 无法读取的文件或容器会记录错误并跳过。
pub struct ResourceWalker {
    source_index: usize,
    pending: VecDeque<Pending>,
    current: std::vec::IntoIter<ComparableResource>,
}

impl ResourceWalker {
    pub fn new(root: &PathInfo) -> Self {
        Self::with_composite(root, false)
    }

    /// `composite` 为真且根是 `.rim` 文件时，同目录的 `_s.rim`、`_dlg.erf` 一并展开
    pub fn with_composite(root: &PathInfo, composite: bool) -> Self {
        let source_index = root.index();
        let pending = match root.kind() {
            PathKind::File(path) => {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_default();
                if is_capsule_name(&name) {
                    let destination = is_module_file(&name).then(|| module_destination(&name));
                    let mut pending = VecDeque::from([Pending::Capsule {
                        prefix: String::new(),
                        path: path.clone(),
                        destination: destination.clone(),
                    }]);
                    if composite {
                        pending.extend(companion_capsules(path, &name).into_iter().map(|path| {
                            Pending::Capsule {
                                prefix: String::new(),
                                path,
                                destination: destination.clone(),
                            }
                        }));
                    }
                    pending
                } else {
                    VecDeque::from([Pending::File {
                        identifier: name,
                        path: path.clone(),
                        destination: None,
                    }])
                }
            }
            PathKind::Folder(path) => match scan_directory(path) {
                Ok(files) => files
                    .into_iter()
                    .map(|entry| Pending::File {
                        identifier: entry.relative,
                        path: entry.path,
                        destination: None,
                    })
                    .collect(),
                Err(e) => {
                    error!("无法遍历目录 {:?}: {}", path, e);
                    VecDeque::new()
                }
            },
            PathKind::Installation(installation) => installation_sources(installation),
        };

        debug!("{} 共有 {} 个待处理来源", root, pending.len());
        Self {
            source_index,
            pending,
            current: Vec::new().into_iter(),
        }
    }

    fn expand(&mut self, source: Pending) -> Option<ComparableResource> {
        match source {
            Pending::File {
                identifier,
                path,
                destination,
            } => match fs::read(&path) {
                Ok(data) => {
                    let resource = ComparableResource::new(identifier, data, self.source_index);
                    Some(match destination {
                        Some(d) => resource.with_destination(d),
                        None => resource,
                    })
                }
                Err(e) => {
                    error!("无法读取文件 {:?}: {}", path, e);
                    None
                }
            },
            Pending::Capsule {
                prefix,
                path,
                destination,
            } => {
                match Capsule::open(&path) {
                    Ok(capsule) => {
                        let mut resources: Vec<ComparableResource> = capsule
                            .resources()
                            .iter()
                            .map(|r| {
                                let resource = ComparableResource::new(
                                    format!("{prefix}{}", r.file_name()),
                                    Bytes::clone(&r.data),
                                    self.source_index,
                                );
                                match &destination {
                                    Some(d) => resource.with_destination(d.clone()),
                                    None => resource,
                                }
                            })
                            .collect();
                        resources.sort_by(|a, b| a.identifier.cmp(&b.identifier));
                        self.current = resources.into_iter();
                    }
                    Err(e) => error!("无法打开容器 {:?}: {}", path, e),
                }
                None
            }
        }
    }
}

impl Iterator for ResourceWalker {
    type Item = ComparableResource;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(resource) = self.current.next() {
                return Some(resource);
            }
            let source = self.pending.pop_front()?;
            if let Some(resource) = self.expand(source) {
                return Some(resource);
            }
        }
    }
}

/// `.rim` 文件同目录下存在的 `_s.rim` 和 `_dlg.erf`
fn companion_capsules(path: &std::path::Path, name: &str) -> Vec<PathBuf> {
    let lower = name.to_lowercase();
    if !lower.ends_with(".rim") || lower.ends_with("_s.rim") {
        return Vec::new();
    }
    let Some(dir) = path.parent() else {
        return Vec::new();
    };
    module_companions(&module_root(name))
        .iter()
        .skip(1)
        .filter_map(|companion| find_child_case_insensitive(dir, companion))
        .filter(|p| p.is_file())
        .collect()
}

/// 安装目录的来源：override 中的松散文件、根目录的字符串表、modules 中的每个容器
///
/// 同一模块的 `.mod`、`.rim`、`_s.rim`、`_dlg.erf` 共用 `modules/<模块名>/` 前缀，
/// 按加载顺序展开，因此同名资源以优先级最高的文件为准。
fn installation_sources(installation: &Installation) -> VecDeque<Pending> {
    let mut pending = VecDeque::new();

    match installation.override_resources() {
        // override 子目录中的文件同样安装到 Override，不按子目录名推断
        Ok(files) => pending.extend(files.into_iter().map(|entry| Pending::File {
            identifier: entry.relative,
            path: entry.path,
            destination: Some(DEFAULT_DESTINATION.to_string()),
        })),
        Err(e) => error!("无法遍历 override 目录: {}", e),
    }

    if let Some(path) = installation.talktable_path() {
        pending.push_back(Pending::File {
            identifier: TALKTABLE_FILE.to_string(),
            path,
            destination: None,
        });
    }

    match installation.module_files() {
        Ok(modules) => pending.extend(modules.into_iter().map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let folder = if is_module_file(&name) {
                module_root(&name)
            } else {
                name.clone()
            };
            Pending::Capsule {
                prefix: format!("modules/{folder}/"),
                path,
                destination: Some(module_destination(&name)),
            }
        })),
        Err(e) => error!("无法遍历 modules 目录: {}", e),
    }

    pending
}

/// 遍历一个对比根
pub fn walk(root: &PathInfo) -> ResourceWalker {
    ResourceWalker::new(root)
}

/// 遍历一个对比根，`.rim` 文件按整个模块组展开
pub fn walk_composite(root: &PathInfo) -> ResourceWalker {
    ResourceWalker::with_composite(root, true)
}
