// crates/sio_pio/src/lib.rs

//! SIO 并行网格数据 IO 层
//!
//! 协调多进程分布式场数据的登记、区域分解与按时间槽读写，
//! 数据保存为自描述的数组文件。
//!
//! # 模块
//!
//! - [`subsystem`]: 子系统上下文（初始化、文件会话表）
//! - [`session`]: 文件会话状态机
//! - [`catalog`]: 维度与变量目录
//! - [`decomp`]: 区域分解描述符与铺排检查
//! - [`tags`]: 场轴标签到文件维度名的映射
//! - [`transport`]: 传输层接口与单 IO 根实现
//! - [`store`]: 文件存储（内存、磁盘）
//! - [`format`]: SCIO 文件格式编解码
//! - [`export`]: 导出为 netCDF（`netcdf` feature）
//!
//! # 使用流程
//!
//! ```text
//! initialize
//!   register_file -> register_dimension* -> register_variable*
//!   -> set_dof* -> set_decomp -> eam_pio_enddef
//!   -> (pio_update_time -> grid_write_data_array*)*
//!   -> eam_pio_closefile
//! finalize
//! ```
//!
//! 除查询外的操作都是集合操作，组内每个进程必须以相同顺序调用。

pub mod catalog;
pub mod decomp;
pub mod error;
pub mod export;
pub mod format;
pub mod image;
pub mod kind;
pub mod session;
pub mod store;
pub mod subsystem;
pub mod tags;
pub mod transport;

mod wire;

// 重导出常用类型
pub use catalog::{Catalog, DimLength, Dimension, VarLayout, VariableInfo};
pub use decomp::{check_tiling, DecompTable, Decomposition};
pub use error::{ErrorKind, PioError, PioResult};
pub use export::export_netcdf;
pub use format::FormatError;
pub use image::FileImage;
pub use kind::{DataKind, Element, FileMode, KindClass, FILL_INT, FILL_REAL, PIO_INT};
pub use session::{FileSession, SessionState};
pub use store::{DiskStore, MemoryStore, Store};
pub use subsystem::IoSubsystem;
pub use tags::{nc_dim_name, FieldTag};
pub use transport::{GatherTransport, Transport, VarTarget};

pub use sio_comm::{decompose_block, BlockSlice, Communicator, SerialComm, ThreadComm};
pub use sio_config::{IoConfig, Precision};

/// 连续块分解的全局偏移
pub fn block_offsets(global: usize, rank: usize, nranks: usize) -> Vec<i64> {
    decompose_block(global, rank, nranks).map_or_else(Vec::new, |b| b.offsets())
}
