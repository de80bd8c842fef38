use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::Result;

/// 一次对比运行的配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DiffConfig {
    /// 无法识别的二进制文件是否做 SHA-256 比较
    pub compare_hashes: bool,
    /// 累计多少次写入后重写一次 INI
    pub batch_size: usize,
    pub ini_filename: String,
    /// 每处理多少个资源组输出一次进度
    pub log_every: usize,
    pub tool_name: String,
    /// 差异输出的格式
    pub diff_format: DiffFormat,
    pub settings: PatchSettings,
}

/// 单个资源差异的输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum DiffFormat {
    /// 每个资源一行摘要
    #[default]
    Default,
    Unified,
    Context,
    SideBySide,
}

/// `[Settings]` 中允许覆盖的键
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PatchSettings {
    pub window_caption: String,
    pub confirm_message: String,
    pub lookup_game_number: u32,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            compare_hashes: true,
            batch_size: 50,
            ini_filename: "changes.ini".to_string(),
            log_every: 100,
            tool_name: "KotorDiff".to_string(),
            diff_format: DiffFormat::default(),
            settings: PatchSettings::default(),
        }
    }
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            window_caption: "Mod Installer".to_string(),
            confirm_message: "Install this mod?".to_string(),
            lookup_game_number: 1,
        }
    }
}

impl DiffConfig {
    /// 从 TOML 文件加载，缺省的键使用默认值
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}
