// crates/sio_pio/src/error.rs

//! IO 层错误类型定义
//!
//! 协议违例（状态错误、未知名称、重复登记）在本地检测，立即中止当前调用；
//! 它们是调用方的编程错误，重试无意义。传输层故障统一归为
//! [`PioError::TransportFailure`]，对整个模拟运行是致命的。

use thiserror::Error;

use crate::kind::FileMode;

/// IO 层结果类型别名
pub type PioResult<T> = Result<T, PioError>;

/// 错误类别（与具体字段无关，便于调用方匹配）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 子系统不在已初始化窗口内
    SubsystemNotReady,
    /// 重复初始化
    AlreadyInitialized,
    /// 未初始化即 finalize
    NotInitialized,
    /// 同名文件已打开
    DuplicateOpen,
    /// 维度重复登记
    DuplicateDimension,
    /// 引用了未登记的维度
    UnknownDimension,
    /// 分解标签缺少 DOF 或未执行 set_decomp
    IncompleteDecomposition,
    /// 定义阶段已结束
    DefinitionClosed,
    /// 定义阶段尚未结束
    NotDefined,
    /// 时间槽越界
    TimeIndexOutOfRange,
    /// 文件已关闭
    AlreadyClosed,
    /// 底层传输故障
    TransportFailure,
    /// 打开模式不允许该操作
    WrongMode,
    /// 从未登记的文件
    UnknownFile,
    /// 文件会话已关闭
    FileNotOpen,
    /// 未登记的变量
    UnknownVariable,
    /// 变量重复登记
    DuplicateVariable,
    /// 分解标签重复绑定（严格模式）
    DuplicateDecomposition,
    /// set_decomp 重复调用
    DecompositionAlreadySet,
    /// 全局偏移越界
    OffsetOutOfRange,
    /// 各进程偏移未恰好铺满全局数组
    TilingViolation,
    /// 形状不一致
    ShapeMismatch,
    /// 数值类型不一致
    KindMismatch,
    /// 缓冲区长度不一致
    SizeMismatch,
    /// 属性不存在
    UnknownAttribute,
    /// 无法映射到文件维度名的场标签
    UnsupportedTag,
    /// 其他非法参数
    InvalidArgument,
}

/// IO 层错误枚举
#[derive(Error, Debug)]
pub enum PioError {
    /// 子系统未就绪
    #[error("IO 子系统未就绪: 操作 {op} 必须在 initialize 与 finalize 之间调用")]
    SubsystemNotReady { op: &'static str },

    /// 重复初始化
    #[error("IO 子系统已初始化 (组件 {component_id})，需先 finalize")]
    AlreadyInitialized { component_id: i32 },

    /// 未初始化
    #[error("IO 子系统未初始化: 操作 {op}")]
    NotInitialized { op: &'static str },

    /// 同名文件已打开
    #[error("文件 {file} 已以 {mode} 模式打开")]
    DuplicateOpen { file: String, mode: FileMode },

    /// 维度重复
    #[error("文件 {file}: 维度 {dim} 已登记")]
    DuplicateDimension { file: String, dim: String },

    /// 未知维度
    #[error("文件 {file}: {context} 引用了未登记的维度 {dim}")]
    UnknownDimension {
        file: String,
        dim: String,
        context: String,
    },

    /// 分解不完整
    #[error("文件 {file}: 变量 {var} 的分解标签 {tag} 未完成绑定 ({reason})")]
    IncompleteDecomposition {
        file: String,
        var: String,
        tag: String,
        reason: &'static str,
    },

    /// 定义阶段已结束
    #[error("文件 {file}: 定义阶段已结束，不允许 {op}")]
    DefinitionClosed { file: String, op: &'static str },

    /// 定义阶段尚未结束
    #[error("文件 {file}: 尚未调用 eam_pio_enddef，不允许 {op}")]
    NotDefined { file: String, op: &'static str },

    /// 时间槽越界
    #[error("文件 {file}: 变量 {var} 的时间槽 {index} 越界 (有效范围 1..={available})")]
    TimeIndexOutOfRange {
        file: String,
        var: String,
        index: usize,
        available: usize,
    },

    /// 已关闭
    #[error("文件 {file} 已关闭")]
    AlreadyClosed { file: String },

    /// 传输故障
    #[error("文件 {file}: 操作 {op} 传输失败: {message}")]
    TransportFailure {
        file: String,
        op: &'static str,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// 模式不符
    #[error("文件 {file} 以 {mode} 模式打开，不允许 {op}")]
    WrongMode {
        file: String,
        op: &'static str,
        mode: FileMode,
    },

    /// 未知文件
    #[error("文件 {file} 未登记: 操作 {op}")]
    UnknownFile { file: String, op: &'static str },

    /// 文件已关闭后仍被使用
    #[error("文件 {file} 已关闭，不允许 {op}")]
    FileNotOpen { file: String, op: &'static str },

    /// 未知变量
    #[error("文件 {file}: 变量 {var} 未登记")]
    UnknownVariable { file: String, var: String },

    /// 变量重复
    #[error("文件 {file}: 变量 {var} 已登记")]
    DuplicateVariable { file: String, var: String },

    /// 分解标签重复绑定
    #[error("文件 {file}: 分解标签 {tag} 已绑定 DOF")]
    DuplicateDecomposition { file: String, tag: String },

    /// set_decomp 重复调用
    #[error("文件 {file}: set_decomp 只能调用一次")]
    DecompositionAlreadySet { file: String },

    /// 全局偏移越界
    #[error("文件 {file}: 分解标签 {tag} 的偏移 {offset} 越界 [0, {global_size})")]
    OffsetOutOfRange {
        file: String,
        tag: String,
        offset: i64,
        global_size: usize,
    },

    /// 铺排违例
    #[error("文件 {file}: 分解标签 {tag} 铺排检查失败: {reason}")]
    TilingViolation {
        file: String,
        tag: String,
        reason: String,
    },

    /// 形状不一致
    #[error("文件 {file}: 变量 {var} 形状不一致: {reason}")]
    ShapeMismatch {
        file: String,
        var: String,
        reason: String,
    },

    /// 数值类型不一致
    #[error("文件 {file}: 变量 {var} 类型不一致: 期望 {expected}, 实际 {actual}")]
    KindMismatch {
        file: String,
        var: String,
        expected: String,
        actual: String,
    },

    /// 缓冲区长度不一致
    #[error("文件 {file}: 变量 {var} 缓冲区长度不一致: 期望 {expected}, 实际 {actual}")]
    SizeMismatch {
        file: String,
        var: String,
        expected: usize,
        actual: usize,
    },

    /// 属性不存在
    #[error("文件 {file}: 属性 {attr} 不存在")]
    UnknownAttribute { file: String, attr: String },

    /// 不支持的场标签
    #[error("场标签 {tag} 无法映射为文件维度")]
    UnsupportedTag { tag: String },

    /// 非法参数
    #[error("文件 {file}: 操作 {op} 参数非法: {reason}")]
    InvalidArgument {
        file: String,
        op: &'static str,
        reason: String,
    },
}

impl PioError {
    /// 传输故障（无底层 IO 错误）
    pub fn transport(file: impl Into<String>, op: &'static str, message: impl Into<String>) -> Self {
        Self::TransportFailure {
            file: file.into(),
            op,
            message: message.into(),
            source: None,
        }
    }

    /// 传输故障（带底层 IO 错误）
    pub fn transport_io(file: impl Into<String>, op: &'static str, source: std::io::Error) -> Self {
        Self::TransportFailure {
            file: file.into(),
            op,
            message: source.to_string(),
            source: Some(source),
        }
    }

    /// 非法参数
    pub fn invalid(file: impl Into<String>, op: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            file: file.into(),
            op,
            reason: reason.into(),
        }
    }

    /// 错误类别
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SubsystemNotReady { .. } => ErrorKind::SubsystemNotReady,
            Self::AlreadyInitialized { .. } => ErrorKind::AlreadyInitialized,
            Self::NotInitialized { .. } => ErrorKind::NotInitialized,
            Self::DuplicateOpen { .. } => ErrorKind::DuplicateOpen,
            Self::DuplicateDimension { .. } => ErrorKind::DuplicateDimension,
            Self::UnknownDimension { .. } => ErrorKind::UnknownDimension,
            Self::IncompleteDecomposition { .. } => ErrorKind::IncompleteDecomposition,
            Self::DefinitionClosed { .. } => ErrorKind::DefinitionClosed,
            Self::NotDefined { .. } => ErrorKind::NotDefined,
            Self::TimeIndexOutOfRange { .. } => ErrorKind::TimeIndexOutOfRange,
            Self::AlreadyClosed { .. } => ErrorKind::AlreadyClosed,
            Self::TransportFailure { .. } => ErrorKind::TransportFailure,
            Self::WrongMode { .. } => ErrorKind::WrongMode,
            Self::UnknownFile { .. } => ErrorKind::UnknownFile,
            Self::FileNotOpen { .. } => ErrorKind::FileNotOpen,
            Self::UnknownVariable { .. } => ErrorKind::UnknownVariable,
            Self::DuplicateVariable { .. } => ErrorKind::DuplicateVariable,
            Self::DuplicateDecomposition { .. } => ErrorKind::DuplicateDecomposition,
            Self::DecompositionAlreadySet { .. } => ErrorKind::DecompositionAlreadySet,
            Self::OffsetOutOfRange { .. } => ErrorKind::OffsetOutOfRange,
            Self::TilingViolation { .. } => ErrorKind::TilingViolation,
            Self::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Self::KindMismatch { .. } => ErrorKind::KindMismatch,
            Self::SizeMismatch { .. } => ErrorKind::SizeMismatch,
            Self::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            Self::UnsupportedTag { .. } => ErrorKind::UnsupportedTag,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// 是否对整个运行致命
    ///
    /// 只有传输故障是致命的：无法保证所有进程写出一致数据时不能继续。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}
