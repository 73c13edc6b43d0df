// crates/sio_comm/src/communicator.rs

//! 通信器抽象
//!
//! 所有方法都是集合操作：组内每个 rank 必须以相同顺序调用，
//! 否则会永久阻塞。没有超时或取消机制。

/// 进程组通信器
pub trait Communicator: Send + Sync {
    /// 本进程编号
    fn rank(&self) -> usize;

    /// 进程组大小
    fn size(&self) -> usize;

    /// 同步屏障
    fn barrier(&self);

    /// 全收集：返回按 rank 排列的各进程数据
    fn all_gather(&self, send: &[u8]) -> Vec<Vec<u8>>;

    /// 广播：返回 `root` 提供的数据，非根进程的 `data` 被忽略
    fn broadcast(&self, root: usize, data: &[u8]) -> Vec<u8> {
        let payload: &[u8] = if self.rank() == root { data } else { &[] };
        let mut all = self.all_gather(payload);
        all.get_mut(root).map(std::mem::take).unwrap_or_default()
    }

    /// 收集到根进程，非根进程得到 `None`
    fn gather(&self, root: usize, send: &[u8]) -> Option<Vec<Vec<u8>>> {
        let all = self.all_gather(send);
        (self.rank() == root).then_some(all)
    }

    /// 所有进程都返回 `true` 时才为 `true`
    fn all_agree(&self, ok: bool) -> bool {
        self.all_gather(&[u8::from(ok)])
            .iter()
            .all(|flag| flag.first() == Some(&1))
    }

    /// 是否为根进程
    fn is_root(&self, root: usize) -> bool {
        self.rank() == root
    }
}

/// 单进程通信器
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialComm;

impl SerialComm {
    /// 创建单进程通信器
    pub fn new() -> Self {
        Self
    }
}

impl Communicator for SerialComm {
    fn rank(&self) -> usize {
        0
    }

    fn size(&self) -> usize {
        1
    }

    fn barrier(&self) {}

    fn all_gather(&self, send: &[u8]) -> Vec<Vec<u8>> {
        vec![send.to_vec()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serial_identity() {
        let comm = SerialComm::new();
        assert_eq!(comm.rank(), 0);
        assert_eq!(comm.size(), 1);
        assert!(comm.is_root(0));
    }

    #[test]
    fn test_serial_collectives() {
        let comm = SerialComm::new();
        assert_eq!(comm.all_gather(&[1, 2, 3]), vec![vec![1, 2, 3]]);
        assert_eq!(comm.broadcast(0, &[7, 8]), vec![7, 8]);
        assert_eq!(comm.gather(0, &[5]), Some(vec![vec![5]]));
        assert!(comm.all_agree(true));
        assert!(!comm.all_agree(false));
    }
}
