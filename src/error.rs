use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// 库内统一错误类型
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O 错误: {0}")]
    Io(#[from] io::Error),

    #[error("路径不存在: {0:?}")]
    PathNotFound(PathBuf),

    #[error("无效的 {format} 数据: {reason}")]
    InvalidFormat { format: &'static str, reason: String },

    /// 读取越界 (ExceedCheck)
    #[error("读取越界: 偏移 {offset} 长度 {len} 超出窗口大小 {size}")]
    OutOfBounds { offset: u64, len: u64, size: u64 },

    /// 补丁格式无法表达的差异
    #[error("{location}: 无法用补丁表达的差异: {reason}")]
    Unrepresentable { location: String, reason: String },

    #[error("配置错误: {0}")]
    Config(#[from] toml::de::Error),

    #[error("目录遍历失败: {0}")]
    Walk(#[from] walkdir::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid(format: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidFormat {
            format,
            reason: reason.into(),
        }
    }

    pub fn unrepresentable(location: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Unrepresentable {
            location: location.into(),
            reason: reason.into(),
        }
    }
}
