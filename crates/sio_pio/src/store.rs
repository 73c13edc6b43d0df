// crates/sio_pio/src/store.rs

//! 存储后端
//!
//! 存储只负责按文件名保存、读取已编码的字节，由 IO 根进程独占访问。

use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// 存储后端 trait
pub trait Store: Send + Sync {
    /// 后端名称（用于日志）
    fn name(&self) -> &'static str;

    /// 读取文件，不存在时返回 `None`
    fn load(&self, file: &str) -> io::Result<Option<Vec<u8>>>;

    /// 保存文件（覆盖）
    fn save(&self, file: &str, bytes: &[u8]) -> io::Result<()>;

    /// 检查文件是否存在
    fn contains(&self, file: &str) -> io::Result<bool> {
        Ok(self.load(file)?.is_some())
    }
}

/// 内存存储
///
/// 克隆共享同一份数据，便于线程模拟的多个 rank 以及读写会话之间共享文件。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    files: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 已保存的文件数
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// 删除文件
    pub fn remove(&self, file: &str) -> Option<Vec<u8>> {
        self.files.write().remove(file)
    }
}

impl Store for MemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn load(&self, file: &str) -> io::Result<Option<Vec<u8>>> {
        Ok(self.files.read().get(file).cloned())
    }

    fn save(&self, file: &str, bytes: &[u8]) -> io::Result<()> {
        self.files.write().insert(file.to_string(), bytes.to_vec());
        Ok(())
    }

    fn contains(&self, file: &str) -> io::Result<bool> {
        Ok(self.files.read().contains_key(file))
    }
}

/// 目录存储
///
/// 文件名相对于根目录解析；绝对路径原样使用。
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    /// 创建目录存储（不存在时创建目录）
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// 根目录
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 文件路径
    pub fn path_of(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }
}

impl Store for DiskStore {
    fn name(&self) -> &'static str {
        "disk"
    }

    fn load(&self, file: &str) -> io::Result<Option<Vec<u8>>> {
        match std::fs::read(self.path_of(file)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn save(&self, file: &str, bytes: &[u8]) -> io::Result<()> {
        let path = self.path_of(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // 使用临时文件写入，成功后重命名（原子操作）
        let mut temp_name = path.as_os_str().to_os_string();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);
        std::fs::write(&temp_path, bytes)?;
        std::fs::rename(&temp_path, &path)?;
        Ok(())
    }

    fn contains(&self, file: &str) -> io::Result<bool> {
        Ok(self.path_of(file).is_file())
    }
}
