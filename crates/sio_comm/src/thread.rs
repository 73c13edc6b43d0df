// crates/sio_comm/src/thread.rs

//! 线程组通信器
//!
//! 在单个进程内用 N 个线程模拟 N 个 rank，每个线程持有一个
//! [`ThreadComm`]。交换通过共享槽位加两次屏障完成。

use parking_lot::Mutex;
use std::sync::{Arc, Barrier};

use crate::communicator::Communicator;

/// 组内共享状态
#[derive(Debug)]
struct Shared {
    size: usize,
    barrier: Barrier,
    slots: Mutex<Vec<Vec<u8>>>,
}

/// 线程组中的一个 rank
#[derive(Debug, Clone)]
pub struct ThreadComm {
    rank: usize,
    shared: Arc<Shared>,
}

impl ThreadComm {
    /// 创建大小为 `size` 的线程组，返回按 rank 排列的通信器
    ///
    /// 每个通信器应移交给独立线程使用；同一线程内调用多个 rank 的
    /// 集合操作会死锁。
    pub fn group(size: usize) -> Vec<ThreadComm> {
        let shared = Arc::new(Shared {
            size,
            barrier: Barrier::new(size.max(1)),
            slots: Mutex::new(vec![Vec::new(); size]),
        });
        (0..size)
            .map(|rank| ThreadComm {
                rank,
                shared: Arc::clone(&shared),
            })
            .collect()
    }
}

impl Communicator for ThreadComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.shared.size
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }

    fn all_gather(&self, send: &[u8]) -> Vec<Vec<u8>> {
        self.shared.slots.lock()[self.rank] = send.to_vec();
        self.shared.barrier.wait();
        let out = self.shared.slots.lock().clone();
        // 所有 rank 读取完毕前不得进入下一轮写入
        self.shared.barrier.wait();
        tracing::trace!(rank = self.rank, bytes = send.len(), "all_gather");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn run_group<F, T>(size: usize, f: F) -> Vec<T>
    where
        F: Fn(ThreadComm) -> T + Send + Sync + Clone + 'static,
        T: Send + 'static,
    {
        let handles: Vec<_> = ThreadComm::group(size)
            .into_iter()
            .map(|comm| {
                let f = f.clone();
                thread::spawn(move || f(comm))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    }

    #[test]
    fn test_group_ranks() {
        let ranks = run_group(3, |comm| (comm.rank(), comm.size()));
        assert_eq!(ranks, vec![(0, 3), (1, 3), (2, 3)]);
    }

    #[test]
    fn test_all_gather_order() {
        let results = run_group(4, |comm| comm.all_gather(&[comm.rank() as u8 * 10]));
        for r in results {
            assert_eq!(r, vec![vec![0], vec![10], vec![20], vec![30]]);
        }
    }

    #[test]
    fn test_repeated_rounds() {
        // 连续多轮交换不能串轮
        let results = run_group(3, |comm| {
            (0..20u8)
                .map(|round| comm.all_gather(&[round, comm.rank() as u8]))
                .collect::<Vec<_>>()
        });
        for per_rank in results {
            for (round, gathered) in per_rank.iter().enumerate() {
                for (rank, payload) in gathered.iter().enumerate() {
                    assert_eq!(payload, &vec![round as u8, rank as u8]);
                }
            }
        }
    }

    #[test]
    fn test_broadcast_and_agree() {
        let results = run_group(2, |comm| {
            let payload: &[u8] = if comm.rank() == 0 { &b"root"[..] } else { &b"ignored"[..] };
            let data = comm.broadcast(0, payload);
            let agree = comm.all_agree(comm.rank() == 0);
            (data, agree)
        });
        for (data, agree) in results {
            assert_eq!(data, b"root".to_vec());
            assert!(!agree);
        }
    }

    #[test]
    fn test_gather_only_root() {
        let results = run_group(2, |comm| comm.gather(0, &[comm.rank() as u8]));
        assert_eq!(results[0], Some(vec![vec![0], vec![1]]));
        assert_eq!(results[1], None);
    }
}
