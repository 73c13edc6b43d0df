// crates/sio_pio/src/tags.rs

//! 场轴标签与文件维度名映射
//!
//! 网格与场的提供方用 [`FieldTag`] 描述数组的各个轴。写入文件时需要把
//! 轴映射为文件中约定俗成的维度名（例如列轴在文件中叫 `ncol`）。
//! 长度随具体场而变的轴（矢量分量、任意变量轴）没有固定的文件维度名，
//! 需要由调用方拆成多个变量分别存储。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PioError, PioResult};

/// 场轴标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldTag {
    /// 谱元
    Element,
    /// 谱元内高斯点
    GaussPoint,
    /// 水平列
    Column,
    /// 垂直层中点
    LevelMidPoint,
    /// 垂直层界面
    LevelInterface,
    /// 时间层
    TimeLevel,
    /// 分量轴（长度由场决定）
    Component,
    /// 气体种类
    Gases,
    /// 短波谱带
    ShortwaveBand,
    /// 长波谱带
    LongwaveBand,
    /// 矢量轴
    Vector,
    /// 任意变量轴
    Variable,
}

impl FieldTag {
    /// 全部标签
    pub const ALL: [FieldTag; 12] = [
        Self::Element,
        Self::GaussPoint,
        Self::Column,
        Self::LevelMidPoint,
        Self::LevelInterface,
        Self::TimeLevel,
        Self::Component,
        Self::Gases,
        Self::ShortwaveBand,
        Self::LongwaveBand,
        Self::Vector,
        Self::Variable,
    ];

    /// 短名（用于布局打印）
    pub fn short_name(&self) -> &'static str {
        match self {
            Self::Element => "EL",
            Self::GaussPoint => "GP",
            Self::Column => "COL",
            Self::LevelMidPoint => "LEV",
            Self::LevelInterface => "ILEV",
            Self::TimeLevel => "TL",
            Self::Component => "CMP",
            Self::Gases => "NGAS",
            Self::ShortwaveBand => "SWBND",
            Self::LongwaveBand => "LWBND",
            Self::Vector => "VEC",
            Self::Variable => "VAR",
        }
    }

    /// 是否能映射为文件维度
    pub fn has_nc_name(&self) -> bool {
        !matches!(self, Self::Vector | Self::Variable)
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for FieldTag {
    type Err = PioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.short_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PioError::UnsupportedTag { tag: s.to_string() })
    }
}

/// 场轴在文件中的维度名
///
/// `extent` 只对分量轴有意义，生成 `dim{extent}`。
pub fn nc_dim_name(tag: FieldTag, extent: usize) -> PioResult<String> {
    let name = match tag {
        FieldTag::Element => "elem",
        FieldTag::LevelMidPoint => "lev",
        FieldTag::LevelInterface => "ilev",
        FieldTag::TimeLevel => "tl",
        FieldTag::Column => "ncol",
        FieldTag::GaussPoint => "gp",
        FieldTag::Component => return Ok(format!("dim{}", extent)),
        FieldTag::Gases => "ngas",
        FieldTag::ShortwaveBand => "swband",
        FieldTag::LongwaveBand => "lwband",
        FieldTag::Vector | FieldTag::Variable => {
            return Err(PioError::UnsupportedTag {
                tag: tag.to_string(),
            })
        }
    };
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_fixed_names() {
        assert_eq!(nc_dim_name(FieldTag::Column, 0).unwrap(), "ncol");
        assert_eq!(nc_dim_name(FieldTag::LevelMidPoint, 72).unwrap(), "lev");
        assert_eq!(nc_dim_name(FieldTag::LevelInterface, 73).unwrap(), "ilev");
        assert_eq!(nc_dim_name(FieldTag::ShortwaveBand, 14).unwrap(), "swband");
        assert_eq!(nc_dim_name(FieldTag::Gases, 8).unwrap(), "ngas");
    }

    #[test]
    fn test_component_uses_extent() {
        assert_eq!(nc_dim_name(FieldTag::Component, 2).unwrap(), "dim2");
    }

    #[test]
    fn test_field_dependent_tags_rejected() {
        for tag in [FieldTag::Vector, FieldTag::Variable] {
            assert!(!tag.has_nc_name());
            let err = nc_dim_name(tag, 3).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedTag);
        }
    }

    #[test]
    fn test_parse_short_name() {
        assert_eq!("col".parse::<FieldTag>().unwrap(), FieldTag::Column);
        assert_eq!("LWBND".parse::<FieldTag>().unwrap(), FieldTag::LongwaveBand);
        assert!("xyz".parse::<FieldTag>().is_err());
    }
}
