// crates/sio_pio/src/decomp.rs

//! 分解描述符
//!
//! 把本进程拥有的本地数组槽位映射到全局一维索引空间。
//! 偏移从 0 开始，必须落在 `[0, global_size)` 内。
//!
//! 各进程偏移的并集恰好铺满全局数组（无空洞、无重叠）是调用方的前置条件；
//! 本层只在启用调试检查时做集合式验证，否则违例会静默破坏输出。

use std::collections::BTreeMap;

use sio_comm::Communicator;

use crate::error::{PioError, PioResult};
use crate::wire;

/// 分解描述符
#[derive(Debug, Clone, PartialEq)]
pub struct Decomposition {
    tag: String,
    offsets: Vec<i64>,
    global_size: Option<usize>,
}

impl Decomposition {
    /// 创建描述符，全局大小在 set_decomp 时确定
    pub fn new(tag: impl Into<String>, offsets: Vec<i64>) -> Self {
        Self {
            tag: tag.into(),
            offsets,
            global_size: None,
        }
    }

    /// 分解标签
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// 全局偏移
    pub fn offsets(&self) -> &[i64] {
        &self.offsets
    }

    /// 本地元素数
    pub fn local_len(&self) -> usize {
        self.offsets.len()
    }

    /// 已绑定的全局大小
    pub fn global_size(&self) -> Option<usize> {
        self.global_size
    }

    /// 绑定全局大小并校验偏移范围
    pub fn bind(&mut self, file: &str, global_size: usize) -> PioResult<()> {
        if let Some(&bad) = self
            .offsets
            .iter()
            .find(|&&o| o < 0 || o as u64 >= global_size as u64)
        {
            return Err(PioError::OffsetOutOfRange {
                file: file.to_string(),
                tag: self.tag.clone(),
                offset: bad,
                global_size,
            });
        }
        self.global_size = Some(global_size);
        Ok(())
    }
}

/// 单个文件的分解表
#[derive(Debug, Clone, Default)]
pub struct DecompTable {
    entries: BTreeMap<String, Decomposition>,
}

impl DecompTable {
    /// 绑定 DOF；返回是否覆盖了已有绑定
    ///
    /// `strict` 为真时拒绝重复绑定，否则后写覆盖。
    pub fn set_dof(
        &mut self,
        file: &str,
        tag: &str,
        offsets: Vec<i64>,
        strict: bool,
    ) -> PioResult<bool> {
        let exists = self.entries.contains_key(tag);
        if exists && strict {
            return Err(PioError::DuplicateDecomposition {
                file: file.to_string(),
                tag: tag.to_string(),
            });
        }
        self.entries
            .insert(tag.to_string(), Decomposition::new(tag, offsets));
        Ok(exists)
    }

    /// 查找描述符
    pub fn get(&self, tag: &str) -> Option<&Decomposition> {
        self.entries.get(tag)
    }

    /// 查找可变描述符
    pub fn get_mut(&mut self, tag: &str) -> Option<&mut Decomposition> {
        self.entries.get_mut(tag)
    }

    /// 已绑定的标签数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 检查若干进程的偏移是否恰好铺满 `[0, global_size)`
pub fn check_tiling(parts: &[&[i64]], global_size: usize) -> Result<(), String> {
    let mut seen = vec![false; global_size];
    let mut count = 0usize;
    for (rank, part) in parts.iter().enumerate() {
        for &offset in part.iter() {
            if offset < 0 || offset as u64 >= global_size as u64 {
                return Err(format!("rank {} 的偏移 {} 越界", rank, offset));
            }
            let slot = &mut seen[offset as usize];
            if *slot {
                return Err(format!("偏移 {} 被重复拥有 (rank {})", offset, rank));
            }
            *slot = true;
            count += 1;
        }
    }
    if count != global_size {
        let missing = seen.iter().position(|s| !s).unwrap_or(0);
        return Err(format!(
            "覆盖 {} / {} 个元素，首个空洞位于偏移 {}",
            count, global_size, missing
        ));
    }
    Ok(())
}

/// 集合式铺排检查：收集所有进程的偏移，在根进程检查后广播结果
pub fn collective_tiling_check(
    comm: &dyn Communicator,
    root: usize,
    file: &str,
    decomp: &Decomposition,
) -> PioResult<()> {
    let global_size = decomp.global_size().unwrap_or(0);
    let verdict = match comm.gather(root, &wire::pack_i64(decomp.offsets())) {
        Some(all) => {
            let parts: Vec<Vec<i64>> = all.iter().map(|b| wire::unpack_i64(b)).collect();
            let views: Vec<&[i64]> = parts.iter().map(Vec::as_slice).collect();
            check_tiling(&views, global_size)
        }
        None => Ok(()),
    };
    wire::share_verdict(comm, root, verdict).map_err(|reason| PioError::TilingViolation {
        file: file.to_string(),
        tag: decomp.tag().to_string(),
        reason,
    })
}
