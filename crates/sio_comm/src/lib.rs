// crates/sio_comm/src/lib.rs

//! SCORPIO-rs 进程组通信层
//!
//! 为集合式 IO 提供最小的进程组抽象。IO 层只依赖 [`Communicator`] trait，
//! 具体实现可以是单进程、进程内线程组，或外部 MPI 绑定。
//!
//! # 模块
//!
//! - [`communicator`]: `Communicator` trait 与单进程实现 `SerialComm`
//! - [`thread`]: `ThreadComm`，用线程模拟多个 rank
//! - [`partition`]: 一维块划分工具
//!
//! # 使用示例
//!
//! ```
//! use sio_comm::{Communicator, ThreadComm};
//!
//! let group = ThreadComm::group(2);
//! let handles: Vec<_> = group
//!     .into_iter()
//!     .map(|comm| {
//!         std::thread::spawn(move || {
//!             let all = comm.all_gather(&[comm.rank() as u8]);
//!             all.concat()
//!         })
//!     })
//!     .collect();
//! for h in handles {
//!     assert_eq!(h.join().unwrap(), vec![0, 1]);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod communicator;
pub mod partition;
pub mod thread;

pub use communicator::{Communicator, SerialComm};
pub use partition::{decompose_block, BlockSlice};
pub use thread::ThreadComm;
