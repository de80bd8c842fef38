use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use log::LevelFilter;
use std::path::PathBuf;

use crate::config::DiffFormat;

/// 控制台输出的详细程度
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// 全部日志和差异
    #[default]
    Full,
    /// 只输出差异内容、警告和错误
    DiffOnly,
    /// 只输出错误
    Quiet,
}

/// KotOR 资源对比与补丁生成工具
#[derive(Parser)]
#[command(name = "kotordiff")]
#[command(about = "对比 KotOR 游戏资源并生成 TSLPatcher 补丁", long_about = None)]
pub struct Cli {
    /// 输出更详细的日志 (-v 调试, -vv 跟踪)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// 只输出警告和错误
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// 输出模式
    #[arg(long, value_enum, default_value_t = OutputMode::Full, global = true)]
    pub output_mode: OutputMode,

    /// 同时把日志写入该文件
    #[arg(long, global = true)]
    pub output_log: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 对比多个根，生成补丁
    Diff {
        /// 要对比的路径，第一个作为基准
        #[arg(required = true, num_args = 2..)]
        paths: Vec<PathBuf>,
        /// 补丁输出目录
        #[arg(short, long)]
        output: PathBuf,
        /// 补丁定义文件名
        #[arg(long)]
        ini: Option<String>,
        /// 暂存基础文件时查找的游戏数据目录
        #[arg(long)]
        base_data: Option<PathBuf>,
        /// 只对比匹配的文件名或模块名，可重复
        #[arg(short, long = "filter")]
        filters: Vec<String>,
        /// 不对无法识别的二进制文件做哈希比较
        #[arg(long)]
        no_hash: bool,
        /// TOML 配置文件
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// 差异文本的格式，覆盖配置文件
        #[arg(long, value_enum)]
        diff_format: Option<DiffFormat>,
    },
}

impl Cli {
    /// 返回 (普通日志级别, 差异内容级别)
    pub fn log_levels(&self) -> (LevelFilter, LevelFilter) {
        let base = match (self.quiet, self.verbose) {
            (true, _) => LevelFilter::Warn,
            (false, 0) => LevelFilter::Info,
            (false, 1) => LevelFilter::Debug,
            (false, _) => LevelFilter::Trace,
        };
        match self.output_mode {
            OutputMode::Full => (base, LevelFilter::Info),
            OutputMode::DiffOnly => (base.min(LevelFilter::Warn), LevelFilter::Info),
            OutputMode::Quiet => (base.min(LevelFilter::Error), LevelFilter::Off),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["kotordiff"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["diff", "a", "b", "-o", "out"]);
        Cli::parse_from(argv)
    }

    #[test]
    fn default_mode_logs_info() {
        assert_eq!(parse(&[]).log_levels(), (LevelFilter::Info, LevelFilter::Info));
        assert_eq!(parse(&["-vv"]).log_levels(), (LevelFilter::Trace, LevelFilter::Info));
    }

    #[test]
    fn diff_only_keeps_diff_output() {
        let cli = parse(&["--output-mode", "diff-only", "-v"]);
        assert_eq!(cli.log_levels(), (LevelFilter::Warn, LevelFilter::Info));
    }

    #[test]
    fn quiet_mode_drops_diff_output() {
        let cli = parse(&["--output-mode", "quiet"]);
        assert_eq!(cli.log_levels(), (LevelFilter::Error, LevelFilter::Off));
    }

    #[test]
    fn diff_format_and_log_file_are_parsed() {
        let cli = Cli::parse_from([
            "kotordiff",
            "--output-log",
            "run.log",
            "diff",
            "a",
            "b",
            "-o",
            "out",
            "--diff-format",
            "side-by-side",
        ]);
        assert_eq!(cli.output_log, Some(PathBuf::from("run.log")));
        let Commands::Diff { diff_format, .. } = cli.command;
        assert_eq!(diff_format, Some(DiffFormat::SideBySide));
    }
}
