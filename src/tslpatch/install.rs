use crate::mods::{InstallFolderMap, ModificationsByType};

/// 由完整的修改累加器重新推导安装目录映射
///
/// 与写入器逐条记录时使用同一套目标规则，
/// 因此两者得到的目录到文件集合一致。
pub fn determine_install_folders(modifications: &ModificationsByType) -> InstallFolderMap {
    let mut folders = InstallFolderMap::new();

    for (folder, file) in modifications.iter().filter_map(|m| m.install_target()) {
        folders.add(&folder, &file);
    }
    for install in &modifications.install {
        let (folder, file) = install.install_target();
        folders.add(&folder, &file);
    }

    folders
}
