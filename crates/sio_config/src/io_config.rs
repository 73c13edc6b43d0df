// crates/sio_config/src/io_config.rs

//! IoConfig - IO 子系统配置
//!
//! 从 JSON 文件加载，所有字段均有默认值。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::precision::Precision;

/// IO 子系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoConfig {
    /// 浮点变量宽度（全局统一）
    #[serde(default)]
    pub precision: Precision,

    /// IO 根进程编号，负责持有数据镜像并访问存储
    #[serde(default)]
    pub io_root: usize,

    /// 是否在 set_decomp 时执行集合式铺排检查（调试用，代价较高）
    #[serde(default)]
    pub check_tiling: bool,

    /// 禁止同一分解标签重复绑定 DOF（默认后写覆盖并告警）
    #[serde(default)]
    pub strict_dof: bool,

    /// 存储后端
    #[serde(default)]
    pub storage: StorageConfig,
}

/// 存储后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// 后端类型
    #[serde(default)]
    pub kind: StorageKind,

    /// 磁盘后端的根目录
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
}

fn default_directory() -> PathBuf { PathBuf::from("output") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::default(),
            directory: default_directory(),
        }
    }
}

/// 存储后端类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// 进程内存（测试用）
    Memory,
    /// 本地目录
    #[default]
    Disk,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            precision: Precision::default(),
            io_root: 0,
            check_tiling: false,
            strict_dof: false,
            storage: StorageConfig::default(),
        }
    }
}

impl IoConfig {
    /// 内存后端配置，便于测试
    pub fn in_memory() -> Self {
        Self {
            storage: StorageConfig {
                kind: StorageKind::Memory,
                ..StorageConfig::default()
            },
            ..Self::default()
        }
    }

    /// 设置浮点宽度
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// 启用铺排检查
    pub fn with_tiling_check(mut self, enabled: bool) -> Self {
        self.check_tiling = enabled;
        self
    }

    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(ConfigError::Io)?;

        let config: IoConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 数据镜像只在 0 号进程聚合
        if self.io_root != 0 {
            return Err(ConfigError::InvalidValue {
                key: "io_root".to_string(),
                value: self.io_root.to_string(),
                reason: "IO 根进程必须为 0".to_string(),
            });
        }

        if self.storage.kind == StorageKind::Disk
            && self.storage.directory.as_os_str().is_empty()
        {
            return Err(ConfigError::Missing("storage.directory".to_string()));
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        std::fs::write(path, content).map_err(ConfigError::Io)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = IoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.precision, Precision::F64);
        assert_eq!(config.storage.kind, StorageKind::Disk);
        assert!(!config.strict_dof);
    }

    #[test]
    fn test_invalid_root() {
        let mut config = IoConfig::default();
        config.io_root = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_empty_directory() {
        let mut config = IoConfig::default();
        config.storage.directory = PathBuf::new();
        assert!(matches!(config.validate(), Err(ConfigError::Missing(_))));

        config.storage.kind = StorageKind::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: IoConfig =
            serde_json::from_str(r#"{"precision":"f32","storage":{"kind":"memory"}}"#).unwrap();
        assert_eq!(config.precision, Precision::F32);
        assert_eq!(config.storage.kind, StorageKind::Memory);
        assert_eq!(config.storage.directory, PathBuf::from("output"));
        assert!(!config.check_tiling);
    }

    #[test]
    fn test_file_roundtrip() {
        let path = std::env::temp_dir().join(format!("sio_config_{}.json", uuid::Uuid::new_v4()));
        let config = IoConfig::in_memory().with_precision(Precision::F32).with_tiling_check(true);
        config.save_to_file(&path).unwrap();

        let loaded = IoConfig::from_file(&path).unwrap();
        assert_eq!(loaded.precision, Precision::F32);
        assert!(loaded.check_tiling);
        assert_eq!(loaded.storage.kind, StorageKind::Memory);

        let _ = std::fs::remove_file(&path);
    }
}
