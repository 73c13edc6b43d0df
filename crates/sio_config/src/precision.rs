// crates/sio_config/src/precision.rs

//! 全局浮点宽度选择
//!
//! 一次运行中所有以浮点类型登记的变量共享同一宽度，
//! 由 `Precision` 在子系统构造时确定。

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// 浮点宽度枚举
///
/// # 示例
///
/// ```rust
/// use sio_config::Precision;
///
/// let precision = Precision::F32;
/// assert_eq!(precision.size_bytes(), 4);
/// assert_eq!(precision.pio_code(), 5);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    /// 单精度浮点 (f32)
    F32,
    /// 双精度浮点 (f64)，默认
    F64,
}

impl Precision {
    /// 获取精度名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    /// 每个标量占用的字节数
    pub fn size_bytes(&self) -> usize {
        match self {
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// 文件中的数值类型代码（5 = 单精度, 6 = 双精度）
    pub fn pio_code(&self) -> i32 {
        match self {
            Self::F32 => 5,
            Self::F64 => 6,
        }
    }

    /// 由数值类型代码还原
    pub fn from_pio_code(code: i32) -> Option<Self> {
        match code {
            5 => Some(Self::F32),
            6 => Some(Self::F64),
            _ => None,
        }
    }

    /// 是否为单精度
    #[inline]
    pub fn is_f32(&self) -> bool {
        matches!(self, Self::F32)
    }

    /// 将 f64 值舍入到本精度可表示的值
    #[inline]
    pub fn round(&self, value: f64) -> f64 {
        match self {
            Self::F32 => value as f32 as f64,
            Self::F64 => value,
        }
    }
}

impl Default for Precision {
    fn default() -> Self {
        Self::F64
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 精度解析错误
#[derive(Debug, Clone, Error)]
#[error("无效的精度值: '{0}', 期望 'f32' 或 'f64'")]
pub struct PrecisionParseError(String);

impl FromStr for Precision {
    type Err = PrecisionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "f32" | "float" | "single" | "float32" => Ok(Self::F32),
            "f64" | "double" | "float64" => Ok(Self::F64),
            _ => Err(PrecisionParseError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_default() {
        assert_eq!(Precision::default(), Precision::F64);
    }

    #[test]
    fn test_precision_parse() {
        assert_eq!("f32".parse::<Precision>().unwrap(), Precision::F32);
        assert_eq!("F64".parse::<Precision>().unwrap(), Precision::F64);
        assert_eq!("double".parse::<Precision>().unwrap(), Precision::F64);
        let err = "half".parse::<Precision>().unwrap_err();
        assert!(err.to_string().contains("half"));
    }

    #[test]
    fn test_pio_codes() {
        assert_eq!(Precision::F32.pio_code(), 5);
        assert_eq!(Precision::F64.pio_code(), 6);
        assert_eq!(Precision::from_pio_code(5), Some(Precision::F32));
        assert_eq!(Precision::from_pio_code(4), None);
    }

    #[test]
    fn test_round() {
        let v = 0.1_f64;
        assert_eq!(Precision::F64.round(v), v);
        assert_eq!(Precision::F32.round(v), 0.1_f32 as f64);
        assert_ne!(Precision::F32.round(v), v);
    }
}
