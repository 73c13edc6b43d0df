// crates/sio_pio/src/catalog.rs

//! 维度与变量目录
//!
//! 每个文件会话独占一份目录。目录同时也是文件头：
//! 关闭写文件时原样序列化，打开读文件时由文件头还原。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{PioError, PioResult};
use crate::kind::DataKind;

/// 维度长度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimLength {
    /// 固定长度
    Fixed(usize),
    /// 无限（记录/时间）维度
    Unlimited,
}

impl DimLength {
    /// 是否为无限维度
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Self::Unlimited)
    }
}

impl From<usize> for DimLength {
    fn from(len: usize) -> Self {
        Self::Fixed(len)
    }
}

impl fmt::Display for DimLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(n) => write!(f, "{}", n),
            Self::Unlimited => write!(f, "UNLIMITED"),
        }
    }
}

/// 维度信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    /// 名称
    pub name: String,
    /// 长名称
    pub long_name: String,
    /// 长度
    pub length: DimLength,
    /// 登记顺序
    #[serde(default)]
    pub index: usize,
}

/// 变量信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableInfo {
    /// 名称
    pub name: String,
    /// 长名称
    pub long_name: String,
    /// 单位
    pub units: String,
    /// 数值类型
    pub kind: DataKind,
    /// 维度名称列表（最慢变化维在前）
    pub dimensions: Vec<String>,
    /// 分解标签，`None` 表示非分布式变量（各进程持有完整数组）
    #[serde(skip)]
    pub decomp_tag: Option<String>,
}

impl VariableInfo {
    /// 创建变量描述
    pub fn new(name: impl Into<String>, kind: DataKind, dimensions: &[&str]) -> Self {
        Self {
            name: name.into(),
            long_name: String::new(),
            units: String::new(),
            kind,
            dimensions: dimensions.iter().map(|d| d.to_string()).collect(),
            decomp_tag: None,
        }
    }

    /// 设置长名称
    pub fn with_long_name(mut self, long_name: impl Into<String>) -> Self {
        self.long_name = long_name.into();
        self
    }

    /// 设置单位
    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    /// 设置分解标签
    pub fn with_decomp(mut self, tag: impl Into<String>) -> Self {
        self.decomp_tag = Some(tag.into());
        self
    }

    /// 是否为分布式变量
    pub fn is_distributed(&self) -> bool {
        self.decomp_tag.is_some()
    }
}

/// 变量的存储布局
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VarLayout {
    /// 是否沿记录维度存放多个时间槽
    pub record: bool,
    /// 单个时间槽（或非记录变量整体）的元素数
    pub frame_len: usize,
}

/// 文件目录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// 维度表
    pub dimensions: BTreeMap<String, Dimension>,
    /// 变量表
    pub variables: BTreeMap<String, VariableInfo>,
    /// 全局整数属性
    pub attributes: BTreeMap<String, i32>,
    /// 各时间槽的模拟时间，下标 0 对应槽 1
    pub time_values: Vec<f64>,
}

impl Catalog {
    /// 登记维度
    pub fn add_dimension(
        &mut self,
        file: &str,
        name: &str,
        long_name: &str,
        length: DimLength,
    ) -> PioResult<()> {
        if self.dimensions.contains_key(name) {
            return Err(PioError::DuplicateDimension {
                file: file.to_string(),
                dim: name.to_string(),
            });
        }
        if length.is_unlimited() {
            if let Some(existing) = self.unlimited_dimension() {
                return Err(PioError::invalid(
                    file,
                    "register_dimension",
                    format!("无限维度 {} 已存在，不能再登记 {}", existing.name, name),
                ));
            }
        }
        let index = self.dimensions.len();
        self.dimensions.insert(
            name.to_string(),
            Dimension {
                name: name.to_string(),
                long_name: long_name.to_string(),
                length,
                index,
            },
        );
        Ok(())
    }

    /// 查找维度
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.get(name)
    }

    /// 无限维度（若有）
    pub fn unlimited_dimension(&self) -> Option<&Dimension> {
        self.dimensions.values().find(|d| d.length.is_unlimited())
    }

    /// 校验变量的维度引用并计算布局
    pub fn check_shape(&self, file: &str, var: &VariableInfo) -> PioResult<VarLayout> {
        let mut record = false;
        let mut frame_len = 1usize;
        for (pos, dim_name) in var.dimensions.iter().enumerate() {
            let dim = self
                .dimension(dim_name)
                .ok_or_else(|| PioError::UnknownDimension {
                    file: file.to_string(),
                    dim: dim_name.clone(),
                    context: format!("变量 {}", var.name),
                })?;
            match dim.length {
                DimLength::Fixed(n) => {
                    frame_len = frame_len.checked_mul(n).ok_or_else(|| PioError::ShapeMismatch {
                        file: file.to_string(),
                        var: var.name.clone(),
                        reason: format!("维度 {} 使单帧元素数溢出", dim_name),
                    })?;
                }
                DimLength::Unlimited if pos == 0 => record = true,
                DimLength::Unlimited => {
                    return Err(PioError::ShapeMismatch {
                        file: file.to_string(),
                        var: var.name.clone(),
                        reason: format!("无限维度 {} 必须位于第一维", dim_name),
                    });
                }
            }
        }
        Ok(VarLayout { record, frame_len })
    }

    /// 登记变量
    pub fn add_variable(&mut self, file: &str, var: VariableInfo) -> PioResult<VarLayout> {
        if self.variables.contains_key(&var.name) {
            return Err(PioError::DuplicateVariable {
                file: file.to_string(),
                var: var.name,
            });
        }
        let layout = self.check_shape(file, &var)?;
        self.variables.insert(var.name.clone(), var);
        Ok(layout)
    }

    /// 查找变量
    pub fn variable(&self, name: &str) -> Option<&VariableInfo> {
        self.variables.get(name)
    }

    /// 已登记变量的布局
    pub fn layout(&self, name: &str) -> Option<VarLayout> {
        let var = self.variable(name)?;
        self.check_shape("", var).ok()
    }

    /// 维度长度；无限维度返回当前时间槽数
    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dimension(name).map(|d| match d.length {
            DimLength::Fixed(n) => n,
            DimLength::Unlimited => self.time_values.len(),
        })
    }

    /// 当前时间槽数
    pub fn num_time_slots(&self) -> usize {
        self.time_values.len()
    }

    /// 按登记顺序列出维度（缺少登记序号的文件头按名称排列）
    pub fn dimensions_in_order(&self) -> Vec<&Dimension> {
        let mut dims: Vec<&Dimension> = self.dimensions.values().collect();
        dims.sort_by_key(|d| d.index);
        dims
    }
}
