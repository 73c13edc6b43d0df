// crates/sio_config/src/lib.rs

//! SCORPIO-rs Config Layer
//!
//! 配置层，提供浮点宽度选择和 IO 子系统配置。
//!
//! # 模块概览
//!
//! - [`precision`]: Precision 枚举（F32/F64），决定全局浮点变量宽度
//! - [`io_config`]: IoConfig IO 子系统配置（JSON 文件）
//! - [`error`]: 配置错误类型
//!
//! # 层级架构
//!
//! ```text
//! Layer 3: sio_cli     ─> uses IoConfig
//! Layer 2: sio_pio     ─> IoSubsystem 读取 IoConfig
//! Layer 1: sio_config  ─> Precision, IoConfig (本层)
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod io_config;
pub mod precision;

// 重导出核心类型
pub use error::ConfigError;
pub use io_config::{IoConfig, StorageConfig, StorageKind};
pub use precision::Precision;
