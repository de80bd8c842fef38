use anyhow::{Context, Result, anyhow};
use clap::Parser;
use std::fs::File;
use std::io::{self, Write};
use std::process::ExitCode;

use kotordiff::cli::{Cli, Commands};
use kotordiff::{
    DIFF_OUTPUT_TARGET, DiffConfig, DiffEngine, DiffOutcome, IncrementalPatchWriter, RootInput,
};

/// 日志同时写到标准错误和文件
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

fn init_logger(cli: &Cli) -> Result<()> {
    let (level, diff_level) = cli.log_levels();
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level)
        .filter_module(DIFF_OUTPUT_TARGET, diff_level)
        .parse_default_env();
    if let Some(path) = &cli.output_log {
        let file = File::create(path)
            .with_context(|| format!("无法创建日志文件 {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(TeeWriter { file })));
    }
    builder.init();
    Ok(())
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logger(&cli)?;

    match cli.command {
        Commands::Diff {
            paths,
            output,
            ini,
            base_data,
            filters,
            no_hash,
            config,
            diff_format,
        } => {
            let mut diff_config = match &config {
                Some(path) => DiffConfig::load(path)
                    .with_context(|| format!("无法读取配置文件 {}", path.display()))?,
                None => DiffConfig::default(),
            };
            if let Some(ini) = ini {
                diff_config.ini_filename = ini;
            }
            if no_hash {
                diff_config.compare_hashes = false;
            }
            if let Some(format) = diff_format {
                diff_config.diff_format = format;
            }

            // 先校验路径，避免在失败时留下输出目录
            for path in &paths {
                if !path.exists() {
                    return Err(anyhow!("路径不存在: {:?}", path));
                }
            }
            if let Some(base) = &base_data
                && !base.is_dir()
            {
                return Err(anyhow!("基础数据目录不存在: {:?}", base));
            }

            let mut writer = IncrementalPatchWriter::new(&output, &diff_config)
                .with_context(|| format!("无法创建输出目录 {}", output.display()))?;
            if let Some(base) = base_data {
                writer = writer.with_base_data(base);
            }

            let roots: Vec<RootInput> = paths.into_iter().map(RootInput::from).collect();
            let engine = DiffEngine::new(diff_config).with_filters(filters);
            let report = engine.run(&roots, Some(&mut writer))?;
            let summary = writer.finalize()?;

            println!("对比结果: {:?}", report.outcome);
            println!("  已处理 {} 个资源组, {} 处差异", report.groups, report.different.len());
            println!("  共 {} 项修改: {summary}", summary.modification_count());
            for (folder, files) in writer.install_folders().folders() {
                println!("  [{folder}]");
                for file in files {
                    println!("    {file}");
                }
            }
            println!("补丁已写入: {}", writer.ini_path().display());

            Ok(match report.outcome {
                DiffOutcome::Identical => ExitCode::SUCCESS,
                DiffOutcome::Different => ExitCode::from(1),
                DiffOutcome::Indeterminate => ExitCode::from(2),
            })
        }
    }
}
