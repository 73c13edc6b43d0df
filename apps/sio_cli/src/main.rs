// apps/sio_cli/src/main.rs

//! SIO 命令行界面
//!
//! 查看 SCIO 文件内容，在进程内线程组上运行多 rank 读写演示，
//! 或把 SCIO 文件导出为 netCDF。

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// SIO 并行网格数据 IO 命令行工具
#[derive(Parser)]
#[command(name = "sio_cli")]
#[command(author = "SCORPIO-rs Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Parallel gridded-data IO toolkit", long_about = None)]
struct Cli {
    /// 日志级别 (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 查看文件头与变量数据
    Inspect(commands::inspect::InspectArgs),
    /// 多 rank 写入/读回演示
    Demo(commands::demo::DemoArgs),
    /// 导出为 netCDF 文件
    Export(commands::export::ExportArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Inspect(args) => commands::inspect::execute(args),
        Commands::Demo(args) => commands::demo::execute(args),
        Commands::Export(args) => commands::export::execute(args),
    }
}
