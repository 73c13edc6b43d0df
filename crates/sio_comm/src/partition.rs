// crates/sio_comm/src/partition.rs

//! 一维块划分
//!
//! 把长度为 `global` 的全局索引空间按 rank 切成连续块，
//! 余数依次分给前面的 rank。

/// 单个 rank 拥有的连续块
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSlice {
    /// 所属 rank
    pub rank: usize,
    /// 进程组大小
    pub nranks: usize,
    /// 全局长度
    pub global: usize,
    /// 起始（含）
    pub start: usize,
    /// 结束（不含）
    pub end: usize,
}

impl BlockSlice {
    /// 本地元素数
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// 是否为空块
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 本块对应的全局偏移（64 位有符号）
    pub fn offsets(&self) -> Vec<i64> {
        (self.start..self.end).map(|i| i as i64).collect()
    }
}

/// 计算 `rank` 在 `nranks` 个进程中的块
///
/// `nranks` 为 0 或 `rank >= nranks` 时返回 `None`。
/// 进程数多于元素数时，尾部 rank 得到空块。
pub fn decompose_block(global: usize, rank: usize, nranks: usize) -> Option<BlockSlice> {
    if nranks == 0 || rank >= nranks {
        return None;
    }
    let base = global / nranks;
    let rem = global % nranks;
    let start = rank * base + rank.min(rem);
    let len = base + usize::from(rank < rem);
    Some(BlockSlice {
        rank,
        nranks,
        global,
        start,
        end: start + len,
    })
}
