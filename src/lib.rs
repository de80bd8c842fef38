//! # KotorDiff
//!
//! KotOR 游戏资源对比与 TSLPatcher 补丁生成库
//!
//! ## 功能
//!
//! - 对比两个或多个根：单个文件、目录、ERF/MOD/RIM/SAV 容器或完整游戏安装目录
//! - 按格式分析 2DA、TLK、SSF 和 GFF 资源，得到结构化修改
//! - 增量写出 `changes.ini` 和安装所需的资源文件
//!
//! ## 使用示例
//!
//! ```no_run
//! use kotordiff::{DiffConfig, DiffEngine, IncrementalPatchWriter, RootInput};
//!
//! let config = DiffConfig::default();
//! let mut writer = IncrementalPatchWriter::new("tslpatchdata", &config).unwrap();
//! let engine = DiffEngine::new(config);
//!
//! let roots = [RootInput::from("vanilla"), RootInput::from("modded")];
//! let report = engine.run(&roots, Some(&mut writer)).unwrap();
//! writer.finalize().unwrap();
//!
//! println!("{:?}", report.outcome);
//! ```

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod formats;
pub mod mods;
pub mod resource;
pub mod tslpatch;
pub mod utils;

// 重新导出常用类型
pub use config::{DiffConfig, PatchSettings};
pub use diff::{
    CancelToken, DIFF_OUTPUT_TARGET, DiffEngine, DiffOutcome, DiffReport, ResourceDiff, RootInput,
};
pub use error::{Error, Result};
pub use mods::{InstallFile, InstallFolderMap, Modification, ModificationsByType};
pub use resource::{ComparableResource, DiffContext};
pub use tslpatch::{IncrementalPatchWriter, WriterSummary, determine_install_folders};
