// tests/multi_rank.rs

//! 多进程集合 IO 测试
//!
//! 用 `ThreadComm` 在单个进程内模拟多个 rank，每个 rank 持有自己的
//! `IoSubsystem`，共享同一个内存存储（只有 IO 根进程会访问它）。

use std::sync::Arc;
use std::thread;

use sio_pio::{
    block_offsets, Communicator, DimLength, ErrorKind, FileMode, IoConfig, IoSubsystem,
    MemoryStore, ThreadComm, VariableInfo,
};

// ============================================================================
// 测试辅助函数
// ============================================================================

/// 在 `nranks` 个线程上运行同一段 rank 代码
fn run_ranks<F, T>(nranks: usize, config: IoConfig, store: MemoryStore, f: F) -> Vec<T>
where
    F: Fn(&mut IoSubsystem, usize) -> T + Send + Sync + 'static,
    T: Send + 'static,
{
    let f = Arc::new(f);
    let handles: Vec<_> = ThreadComm::group(nranks)
        .into_iter()
        .map(|comm| {
            let f = Arc::clone(&f);
            let config = config.clone();
            let store = store.clone();
            thread::spawn(move || {
                let rank = comm.rank();
                let mut io = IoSubsystem::with_store(config, store);
                io.initialize(Arc::new(comm), 0).unwrap();
                let out = f(&mut io, rank);
                io.finalize().unwrap();
                out
            })
        })
        .collect();
    handles.into_iter().map(|h| h.join().unwrap()).collect()
}

fn define_split(io: &mut IoSubsystem, file: &str, offsets: &[i64]) {
    let real = io.real_kind();
    io.register_file(file, FileMode::Write).unwrap();
    io.register_dimension(file, "ncol", "columns", DimLength::Fixed(10))
        .unwrap();
    io.register_variable(file, VariableInfo::new("x", real, &["ncol"]).with_decomp("col"))
        .unwrap();
    io.set_dof(file, "x", offsets.len(), offsets).unwrap();
    io.set_decomp(file).unwrap();
    io.eam_pio_enddef(file).unwrap();
}

fn read_full(io: &mut IoSubsystem, file: &str) -> Vec<f64> {
    let real = io.real_kind();
    io.register_file(file, FileMode::Read).unwrap();
    io.get_variable(file, VariableInfo::new("x", real, &["ncol"]))
        .unwrap();
    io.eam_pio_enddef(file).unwrap();
    let mut full = vec![0.0f64; 10];
    io.grid_read_data_array(file, "x", 1, &mut full).unwrap();
    io.eam_pio_closefile(file).unwrap();
    full
}

// ============================================================================
// 测试
// ============================================================================

#[test]
fn test_two_rank_split_reconstructs_sequence() {
    let store = MemoryStore::new();
    let results = run_ranks(2, IoConfig::in_memory(), store, |io, rank| {
        let offsets = block_offsets(10, rank, 2);
        let local: Vec<f64> = offsets.iter().map(|&o| o as f64).collect();
        define_split(io, "split.dat", &offsets);
        io.grid_write_data_array("split.dat", "x", &local).unwrap();
        io.eam_pio_closefile("split.dat").unwrap();
        read_full(io, "split.dat")
    });

    let expected: Vec<f64> = (0..10).map(f64::from).collect();
    for full in results {
        assert_eq!(full, expected);
    }
}

#[test]
fn test_interleaved_decomposition_read_back() {
    let store = MemoryStore::new();
    let results = run_ranks(3, IoConfig::in_memory().with_tiling_check(true), store, |io, rank| {
        // 轮转分配：rank r 拥有 r, r+3, r+6, ...
        let offsets: Vec<i64> = (rank as i64..10).step_by(3).collect();
        let local: Vec<f64> = offsets.iter().map(|&o| 10.0 * o as f64).collect();
        define_split(io, "rr.dat", &offsets);
        io.grid_write_data_array("rr.dat", "x", &local).unwrap();
        io.eam_pio_closefile("rr.dat").unwrap();

        // 用块分解读回
        let real = io.real_kind();
        let block = block_offsets(10, rank, 3);
        io.register_file("rr.dat", FileMode::Read).unwrap();
        io.get_variable("rr.dat", VariableInfo::new("x", real, &["ncol"]).with_decomp("blk"))
            .unwrap();
        io.set_dof("rr.dat", "x", block.len(), &block).unwrap();
        io.set_decomp("rr.dat").unwrap();
        io.eam_pio_enddef("rr.dat").unwrap();
        let mut mine = vec![0.0f64; block.len()];
        io.grid_read_data_array("rr.dat", "x", 1, &mut mine).unwrap();
        (block, mine)
    });

    for (block, mine) in results {
        let want: Vec<f64> = block.iter().map(|&o| 10.0 * o as f64).collect();
        assert_eq!(mine, want);
    }
}

#[test]
fn test_tiling_violation_reported_on_every_rank() {
    let store = MemoryStore::new();
    let config = IoConfig::in_memory().with_tiling_check(true);
    let kinds = run_ranks(2, config, store, |io, rank| {
        let real = io.real_kind();
        // 两个 rank 都声称拥有偏移 4
        let offsets: Vec<i64> = if rank == 0 {
            (0..5).collect()
        } else {
            (4..10).collect()
        };
        io.register_file("bad.dat", FileMode::Write).unwrap();
        io.register_dimension("bad.dat", "ncol", "", DimLength::Fixed(10))
            .unwrap();
        io.register_variable("bad.dat", VariableInfo::new("x", real, &["ncol"]).with_decomp("col"))
            .unwrap();
        io.set_dof("bad.dat", "x", offsets.len(), &offsets).unwrap();
        let kind = io.set_decomp("bad.dat").unwrap_err().kind();
        io.eam_pio_closefile("bad.dat").unwrap();
        kind
    });
    assert_eq!(kinds, vec![ErrorKind::TilingViolation; 2]);
}

#[test]
fn test_out_of_range_offset_on_one_rank() {
    let store = MemoryStore::new();
    let kinds = run_ranks(2, IoConfig::in_memory(), store, |io, rank| {
        let real = io.real_kind();
        let offsets: Vec<i64> = if rank == 0 { vec![0, 1] } else { vec![12] };
        io.register_file("oor.dat", FileMode::Write).unwrap();
        io.register_dimension("oor.dat", "ncol", "", DimLength::Fixed(10))
            .unwrap();
        io.register_variable("oor.dat", VariableInfo::new("x", real, &["ncol"]).with_decomp("col"))
            .unwrap();
        io.set_dof("oor.dat", "x", offsets.len(), &offsets).unwrap();
        io.set_decomp("oor.dat").unwrap_err().kind()
    });
    // 越界的 rank 报告具体原因，其余 rank 得到一致的失败
    assert_eq!(kinds[0], ErrorKind::InvalidArgument);
    assert_eq!(kinds[1], ErrorKind::OffsetOutOfRange);
}

#[test]
fn test_record_variable_across_ranks() {
    let store = MemoryStore::new();
    let results = run_ranks(2, IoConfig::in_memory(), store.clone(), |io, rank| {
        let real = io.real_kind();
        let offsets = block_offsets(6, rank, 2);
        io.register_file("rec.dat", FileMode::Write).unwrap();
        io.register_dimension("rec.dat", "time", "", DimLength::Unlimited)
            .unwrap();
        io.register_dimension("rec.dat", "ncol", "", DimLength::Fixed(6))
            .unwrap();
        io.register_variable(
            "rec.dat",
            VariableInfo::new("ps", real, &["time", "ncol"]).with_decomp("col"),
        )
        .unwrap();
        io.set_dof("rec.dat", "ps", offsets.len(), &offsets).unwrap();
        io.set_decomp("rec.dat").unwrap();
        io.eam_pio_enddef("rec.dat").unwrap();
        for step in 1..=3 {
            io.pio_update_time("rec.dat", step as f64 * 0.5).unwrap();
            let local: Vec<f64> = offsets
                .iter()
                .map(|&o| step as f64 * 100.0 + o as f64)
                .collect();
            io.grid_write_data_array("rec.dat", "ps", &local).unwrap();
        }
        io.eam_pio_closefile("rec.dat").unwrap();

        io.register_file("rec.dat", FileMode::Read).unwrap();
        let slots = io.get_dimlen("rec.dat", "time").unwrap();
        let times = io.time_values("rec.dat").unwrap().to_vec();
        io.get_variable("rec.dat", VariableInfo::new("ps", real, &["time", "ncol"]))
            .unwrap();
        io.eam_pio_enddef("rec.dat").unwrap();
        let mut second = vec![0.0f64; 6];
        io.grid_read_data_array("rec.dat", "ps", 2, &mut second).unwrap();
        (slots, times, second)
    });

    for (slots, times, second) in results {
        assert_eq!(slots, 3);
        assert_eq!(times, vec![0.5, 1.0, 1.5]);
        assert_eq!(second, vec![200.0, 201.0, 202.0, 203.0, 204.0, 205.0]);
    }
    assert_eq!(store.len(), 1);
}

#[test]
fn test_missing_file_fails_on_every_rank() {
    let store = MemoryStore::new();
    let kinds = run_ranks(3, IoConfig::in_memory(), store, |io, _| {
        io.register_file("ghost.dat", FileMode::Read)
            .unwrap_err()
            .kind()
    });
    assert_eq!(kinds, vec![ErrorKind::TransportFailure; 3]);
}
