// apps/sio_cli/src/commands/export.rs

//! netCDF 导出命令
//!
//! 需要以 `--features netcdf` 构建。

use anyhow::{Context, Result};
use clap::Args;
use sio_pio::{export_netcdf, format};
use std::path::PathBuf;
use tracing::info;

/// 导出参数
#[derive(Args)]
pub struct ExportArgs {
    /// SCIO 文件路径
    pub file: PathBuf,

    /// 输出的 netCDF 文件路径
    #[arg(short, long)]
    pub output: PathBuf,
}

/// 执行导出命令
pub fn execute(args: ExportArgs) -> Result<()> {
    let bytes = std::fs::read(&args.file)
        .with_context(|| format!("无法读取 {}", args.file.display()))?;
    let image = format::decode(&bytes)
        .with_context(|| format!("{} 不是有效的 SCIO 文件", args.file.display()))?;
    info!(file = %args.file.display(), output = %args.output.display(), "export");

    export_netcdf(&image, &args.output)
        .with_context(|| format!("导出 {} 失败", args.output.display()))?;
    println!("已导出 {}", args.output.display());
    Ok(())
}
