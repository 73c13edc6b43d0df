// apps/sio_cli/src/commands/demo.rs

//! 多 rank 演示命令
//!
//! 在进程内线程组上模拟 `ranks` 个进程：按块分解写入一个带时间维的
//! 分布式变量，关闭后按轮转分解读回，并逐元素核对。

use anyhow::{bail, Context, Result};
use clap::Args;
use sio_comm::{Communicator, ThreadComm};
use sio_config::{IoConfig, Precision, StorageKind};
use sio_pio::{
    block_offsets, DimLength, DiskStore, FileMode, IoSubsystem, MemoryStore, PioResult, Store,
    VariableInfo,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::info;

/// 演示参数
#[derive(Args, Clone)]
pub struct DemoArgs {
    /// 配置文件路径（JSON）
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 模拟的进程数
    #[arg(short, long, default_value = "4")]
    pub ranks: usize,

    /// 列数
    #[arg(long, default_value = "16")]
    pub ncol: usize,

    /// 时间步数
    #[arg(long, default_value = "3")]
    pub steps: usize,

    /// 输出文件名
    #[arg(short, long, default_value = "demo.dat")]
    pub file: String,

    /// 浮点精度 (f32, f64)，覆盖配置文件中的设置
    #[arg(long)]
    pub precision: Option<Precision>,
}

/// 执行演示命令
pub fn execute(args: DemoArgs) -> Result<()> {
    if args.ranks == 0 {
        bail!("进程数必须大于 0");
    }

    let mut config = match &args.config {
        Some(path) => IoConfig::from_file(path)
            .with_context(|| format!("无法加载配置 {}", path.display()))?,
        None => IoConfig::in_memory(),
    };
    if let Some(precision) = args.precision {
        config = config.with_precision(precision);
    }
    config.validate().context("配置无效")?;

    info!(
        ranks = args.ranks,
        ncol = args.ncol,
        steps = args.steps,
        precision = config.precision.name(),
        "=== SIO 多 rank 演示 ==="
    );

    let mismatches = match config.storage.kind {
        StorageKind::Memory => run_group(MemoryStore::new(), config, &args)?,
        StorageKind::Disk => {
            let store = DiskStore::new(&config.storage.directory).with_context(|| {
                format!("无法创建目录 {}", config.storage.directory.display())
            })?;
            println!("输出文件: {}", store.path_of(&args.file).display());
            run_group(store, config, &args)?
        }
    };

    if mismatches > 0 {
        bail!("读回数据与写入不一致: {} 个元素", mismatches);
    }
    println!(
        "{} 个 rank 写入并读回 {} 列 x {} 步，数据一致",
        args.ranks, args.ncol, args.steps
    );
    Ok(())
}

fn run_group<S: Store + Clone + 'static>(store: S, config: IoConfig, args: &DemoArgs) -> Result<usize> {
    let handles: Vec<_> = ThreadComm::group(args.ranks)
        .into_iter()
        .map(|comm| {
            let store = store.clone();
            let config = config.clone();
            let args = args.clone();
            thread::spawn(move || -> PioResult<usize> {
                let mut io = IoSubsystem::with_store(config, store);
                io.initialize(Arc::new(comm), 0)?;
                let mismatches = rank_main(&mut io, &args)?;
                io.finalize()?;
                Ok(mismatches)
            })
        })
        .collect();

    let mut total = 0;
    for (rank, handle) in handles.into_iter().enumerate() {
        let result = handle
            .join()
            .map_err(|_| anyhow::anyhow!("rank {} 线程异常退出", rank))?;
        total += result.with_context(|| format!("rank {} 失败", rank))?;
    }
    Ok(total)
}

/// 单个 rank 的写入与读回
fn rank_main(io: &mut IoSubsystem, args: &DemoArgs) -> PioResult<usize> {
    let (rank, nranks) = match io.communicator() {
        Some(comm) => (comm.rank(), comm.size()),
        None => (0, 1),
    };
    let file = args.file.as_str();
    let real = io.real_kind();
    let value = |step: usize, col: i64| step as f64 * 1000.0 + col as f64;

    // 写入：连续块分解
    let block = block_offsets(args.ncol, rank, nranks);
    io.register_file(file, FileMode::Write)?;
    io.register_dimension(file, "time", "time", DimLength::Unlimited)?;
    io.register_dimension(file, "ncol", "columns", DimLength::Fixed(args.ncol))?;
    io.register_variable(
        file,
        VariableInfo::new("ps", real, &["time", "ncol"])
            .with_long_name("surface pressure")
            .with_units("Pa")
            .with_decomp("col"),
    )?;
    io.set_dof(file, "ps", block.len(), &block)?;
    io.set_decomp(file)?;
    io.set_int_attribute(file, "nranks", nranks as i32)?;
    io.eam_pio_enddef(file)?;
    for step in 1..=args.steps {
        io.pio_update_time(file, step as f64 * 60.0)?;
        let local: Vec<f64> = block.iter().map(|&c| value(step, c)).collect();
        io.grid_write_data_array(file, "ps", &local)?;
    }
    io.eam_pio_closefile(file)?;

    // 读回：轮转分解
    let strided: Vec<i64> = (rank as i64..args.ncol as i64)
        .step_by(nranks)
        .collect();
    io.register_file(file, FileMode::Read)?;
    io.get_variable(
        file,
        VariableInfo::new("ps", real, &["time", "ncol"]).with_decomp("strided"),
    )?;
    io.set_dof(file, "ps", strided.len(), &strided)?;
    io.set_decomp(file)?;
    io.eam_pio_enddef(file)?;

    let slots = io.get_dimlen(file, "time")?;
    let mut mismatches = 0;
    let mut buf = vec![0.0f64; strided.len()];
    for step in 1..=slots {
        io.grid_read_data_array(file, "ps", step, &mut buf)?;
        mismatches += strided
            .iter()
            .zip(&buf)
            .filter(|&(&c, &got)| got != real.normalize(value(step, c)))
            .count();
    }
    io.eam_pio_closefile(file)?;
    info!(rank, slots, mismatches, "rank 完成");
    Ok(mismatches)
}
