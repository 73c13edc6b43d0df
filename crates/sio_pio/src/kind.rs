// crates/sio_pio/src/kind.rs

//! 打开模式与数值类型
//!
//! 数值类型只有两类：4 字节整数，以及宽度由全局 [`Precision`] 决定的浮点。

use serde::{Deserialize, Serialize};
use sio_config::Precision;
use std::fmt;

/// 整数类型代码
pub const PIO_INT: i32 = 4;

/// 整数缺测填充值
pub const FILL_INT: i32 = -2_147_483_647;

/// 浮点缺测填充值
pub const FILL_REAL: f64 = 9.969_209_968_386_869e36;

/// 文件打开模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    /// 读
    Read,
    /// 写
    Write,
}

impl FileMode {
    /// 模式代码（1 = 读, 2 = 写）
    pub fn code(&self) -> i32 {
        match self {
            Self::Read => 1,
            Self::Write => 2,
        }
    }

    /// 由模式代码还原
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            1 => Some(Self::Read),
            2 => Some(Self::Write),
            _ => None,
        }
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "Read"),
            Self::Write => write!(f, "Write"),
        }
    }
}

/// 数值大类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KindClass {
    /// 整数
    Integer,
    /// 浮点
    Floating,
}

/// 变量数值类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// 4 字节整数
    Int,
    /// 浮点，宽度由精度决定
    Real(Precision),
}

impl DataKind {
    /// 类型代码（4 = int, 5 = f32, 6 = f64）
    pub fn pio_code(&self) -> i32 {
        match self {
            Self::Int => PIO_INT,
            Self::Real(p) => p.pio_code(),
        }
    }

    /// 由类型代码还原
    pub fn from_pio_code(code: i32) -> Option<Self> {
        if code == PIO_INT {
            return Some(Self::Int);
        }
        Precision::from_pio_code(code).map(Self::Real)
    }

    /// 单个元素字节数
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::Int => 4,
            Self::Real(p) => p.size_bytes(),
        }
    }

    /// 数值大类
    pub fn class(&self) -> KindClass {
        match self {
            Self::Int => KindClass::Integer,
            Self::Real(_) => KindClass::Floating,
        }
    }

    /// 缺测填充值
    pub fn fill_value(&self) -> f64 {
        match self {
            Self::Int => FILL_INT as f64,
            Self::Real(p) => p.round(FILL_REAL),
        }
    }

    /// 把写入值规整为本类型可表示的值
    #[inline]
    pub fn normalize(&self, value: f64) -> f64 {
        match self {
            Self::Int => value,
            Self::Real(p) => p.round(value),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int => write!(f, "int"),
            Self::Real(p) => write!(f, "real({})", p),
        }
    }
}

/// 可传输的元素类型
///
/// 内部统一以 f64 搬运：每个 i32 和 f32 在 f64 中都能精确表示，
/// 往返转换不丢位。
pub trait Element: Copy + Default + Send + Sync + 'static {
    /// 所属数值大类
    const CLASS: KindClass;
    /// 类型名（用于诊断）
    const NAME: &'static str;

    /// 转为 f64
    fn to_f64(self) -> f64;

    /// 由 f64 还原
    fn from_f64(value: f64) -> Self;
}

impl Element for i32 {
    const CLASS: KindClass = KindClass::Integer;
    const NAME: &'static str = "i32";

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as i32
    }
}

impl Element for f32 {
    const CLASS: KindClass = KindClass::Floating;
    const NAME: &'static str = "f32";

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Element for f64 {
    const CLASS: KindClass = KindClass::Floating;
    const NAME: &'static str = "f64";

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}
