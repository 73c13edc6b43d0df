// crates/sio_pio/src/subsystem.rs

//! IO 子系统上下文
//!
//! [`IoSubsystem`] 持有进程组、组件编号与全部文件会话。所有文件操作都
//! 通过它进行，且只能在 `initialize` 与 `finalize` 之间调用。
//!
//! # 示例
//!
//! ```
//! use std::sync::Arc;
//! use sio_comm::SerialComm;
//! use sio_config::IoConfig;
//! use sio_pio::{DimLength, FileMode, IoSubsystem, MemoryStore, VariableInfo};
//!
//! let store = MemoryStore::new();
//! let mut io = IoSubsystem::with_store(IoConfig::in_memory(), store.clone());
//! io.initialize(Arc::new(SerialComm::new()), 0).unwrap();
//!
//! io.register_file("out.dat", FileMode::Write).unwrap();
//! io.register_dimension("out.dat", "level", "vertical level", DimLength::Fixed(3)).unwrap();
//! let real = io.real_kind();
//! io.register_variable("out.dat", VariableInfo::new("t", real, &["level"])).unwrap();
//! io.eam_pio_enddef("out.dat").unwrap();
//! io.grid_write_data_array("out.dat", "t", &[1.0f64, 2.0, 3.0]).unwrap();
//! io.eam_pio_closefile("out.dat").unwrap();
//!
//! io.register_file("out.dat", FileMode::Read).unwrap();
//! io.get_variable("out.dat", VariableInfo::new("t", real, &["level"])).unwrap();
//! io.eam_pio_enddef("out.dat").unwrap();
//! let mut buf = [0.0f64; 3];
//! io.grid_read_data_array("out.dat", "t", 1, &mut buf).unwrap();
//! assert_eq!(buf, [1.0, 2.0, 3.0]);
//! io.finalize().unwrap();
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use sio_comm::Communicator;
use sio_config::{IoConfig, StorageKind};
use tracing::{info, warn};

use crate::catalog::{DimLength, VariableInfo};
use crate::error::{PioError, PioResult};
use crate::kind::{DataKind, Element, FileMode, PIO_INT};
use crate::session::{FileSession, IoLink, SessionState};
use crate::store::{DiskStore, MemoryStore, Store};
use crate::transport::{GatherTransport, Transport};

/// IO 子系统
pub struct IoSubsystem {
    config: IoConfig,
    transport: Box<dyn Transport>,
    comm: Option<Arc<dyn Communicator>>,
    component_id: i32,
    sessions: BTreeMap<String, FileSession>,
}

impl std::fmt::Debug for IoSubsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoSubsystem")
            .field("transport", &self.transport.name())
            .field("initialized", &self.comm.is_some())
            .field("component_id", &self.component_id)
            .field("files", &self.sessions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl IoSubsystem {
    /// 以给定传输层创建（未初始化）
    pub fn new(config: IoConfig, transport: Box<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            comm: None,
            component_id: 0,
            sessions: BTreeMap::new(),
        }
    }

    /// 以给定存储创建单 IO 根传输层
    pub fn with_store<S: Store + 'static>(config: IoConfig, store: S) -> Self {
        let transport = GatherTransport::with_root(store, config.io_root);
        Self::new(config, Box::new(transport))
    }

    /// 按配置创建存储与传输层
    pub fn from_config(config: IoConfig) -> PioResult<Self> {
        config
            .validate()
            .map_err(|e| PioError::invalid("", "from_config", e.to_string()))?;
        Ok(match config.storage.kind {
            StorageKind::Memory => Self::with_store(config, MemoryStore::new()),
            StorageKind::Disk => {
                let dir = config.storage.directory.clone();
                let store = DiskStore::new(&dir).map_err(|e| {
                    PioError::transport_io(dir.display().to_string(), "from_config", e)
                })?;
                Self::with_store(config, store)
            }
        })
    }

    /// 配置
    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    /// 构建期浮点类型
    pub fn real_kind(&self) -> DataKind {
        DataKind::Real(self.config.precision)
    }

    /// 由 PIO 类型码得到数值类型；浮点码必须与构建期精度一致
    pub fn kind_from_code(&self, code: i32) -> PioResult<DataKind> {
        if code == PIO_INT {
            return Ok(DataKind::Int);
        }
        if code == self.config.precision.pio_code() {
            return Ok(self.real_kind());
        }
        Err(PioError::invalid(
            "",
            "kind_from_code",
            format!(
                "类型码 {} 不可用 (整数 {}, 浮点 {})",
                code,
                PIO_INT,
                self.config.precision.pio_code()
            ),
        ))
    }

    // ========== 生命周期 ==========

    /// 初始化子系统
    pub fn initialize(&mut self, comm: Arc<dyn Communicator>, component_id: i32) -> PioResult<()> {
        if self.comm.is_some() {
            return Err(PioError::AlreadyInitialized {
                component_id: self.component_id,
            });
        }
        info!(
            rank = comm.rank(),
            size = comm.size(),
            component_id,
            transport = self.transport.name(),
            "IO 子系统初始化"
        );
        self.comm = Some(comm);
        self.component_id = component_id;
        Ok(())
    }

    /// 结束子系统，强制关闭仍打开的文件
    pub fn finalize(&mut self) -> PioResult<()> {
        let comm = self
            .comm
            .clone()
            .ok_or(PioError::NotInitialized { op: "finalize" })?;

        let mut first_err = None;
        for session in self.sessions.values_mut().filter(|s| s.is_open()) {
            warn!(file = session.name(), mode = %session.mode(), "finalize 时文件仍打开，强制关闭");
            let link = IoLink {
                comm: comm.as_ref(),
                transport: self.transport.as_mut(),
            };
            if let Err(e) = session.close(link) {
                first_err.get_or_insert(e);
            }
        }
        self.sessions.clear();
        self.comm = None;
        info!(component_id = self.component_id, "IO 子系统已结束");
        first_err.map_or(Ok(()), Err)
    }

    /// 是否处于已初始化窗口
    pub fn is_initialized(&self) -> bool {
        self.comm.is_some()
    }

    /// 组件编号
    pub fn component_id(&self) -> i32 {
        self.component_id
    }

    /// 进程组
    pub fn communicator(&self) -> Option<&Arc<dyn Communicator>> {
        self.comm.as_ref()
    }

    /// 本进程编号（未初始化时为 0）
    pub fn rank(&self) -> usize {
        self.comm.as_ref().map_or(0, |c| c.rank())
    }

    // ========== 内部辅助 ==========

    fn comm(&self, op: &'static str) -> PioResult<Arc<dyn Communicator>> {
        self.comm.clone().ok_or(PioError::SubsystemNotReady { op })
    }

    fn session(&self, file: &str, op: &'static str) -> PioResult<&FileSession> {
        self.comm(op)?;
        self.sessions.get(file).ok_or_else(|| PioError::UnknownFile {
            file: file.to_string(),
            op,
        })
    }

    /// 取得会话与传输上下文
    fn session_link(
        &mut self,
        file: &str,
        op: &'static str,
    ) -> PioResult<(Arc<dyn Communicator>, &mut FileSession, &mut dyn Transport)> {
        let comm = self.comm(op)?;
        let session = self.sessions.get_mut(file).ok_or_else(|| PioError::UnknownFile {
            file: file.to_string(),
            op,
        })?;
        Ok((comm, session, self.transport.as_mut()))
    }

    fn session_mut(&mut self, file: &str, op: &'static str) -> PioResult<&mut FileSession> {
        self.session_link(file, op).map(|(_, s, _)| s)
    }

    // ========== 文件会话 ==========

    /// 登记文件（集合操作）
    ///
    /// 读模式下文件必须已存在，其维度、属性与时间槽从文件头载入。
    pub fn register_file(&mut self, file: &str, mode: FileMode) -> PioResult<()> {
        const OP: &str = "register_file";
        let comm = self.comm(OP)?;
        if let Some(existing) = self.sessions.get(file).filter(|s| s.is_open()) {
            return Err(PioError::DuplicateOpen {
                file: file.to_string(),
                mode: existing.mode(),
            });
        }

        let session = match mode {
            FileMode::Write => {
                self.transport.create(comm.as_ref(), file)?;
                FileSession::for_write(file)
            }
            FileMode::Read => {
                let header = self.transport.open(comm.as_ref(), file)?;
                FileSession::for_read(file, header)
            }
        };
        info!(file, %mode, "文件已登记");
        self.sessions.insert(file.to_string(), session);
        Ok(())
    }

    /// 登记维度
    pub fn register_dimension(
        &mut self,
        file: &str,
        name: &str,
        long_name: &str,
        length: DimLength,
    ) -> PioResult<()> {
        self.session_mut(file, "register_dimension")?
            .register_dimension(name, long_name, length)
    }

    /// 登记待写变量
    ///
    /// 浮点变量一律使用构建期精度。
    pub fn register_variable(&mut self, file: &str, mut var: VariableInfo) -> PioResult<()> {
        if let DataKind::Real(_) = var.kind {
            var.kind = self.real_kind();
        }
        self.session_mut(file, "register_variable")?
            .register_variable(var)
    }

    /// 确认待读变量
    pub fn get_variable(&mut self, file: &str, var: VariableInfo) -> PioResult<()> {
        self.session_mut(file, "get_variable")?.get_variable(var)
    }

    /// 绑定变量分解标签的 DOF
    pub fn set_dof(
        &mut self,
        file: &str,
        var: &str,
        local_count: usize,
        offsets: &[i64],
    ) -> PioResult<()> {
        let strict = self.config.strict_dof;
        self.session_mut(file, "set_dof")?
            .set_dof(var, local_count, offsets, strict)
            .map(|_| ())
    }

    /// 完成分解绑定（集合操作）
    pub fn set_decomp(&mut self, file: &str) -> PioResult<()> {
        let check = self.config.check_tiling;
        let (comm, session, _) = self.session_link(file, "set_decomp")?;
        session.set_decomp(comm.as_ref(), check)
    }

    /// 结束定义阶段（集合操作）
    pub fn eam_pio_enddef(&mut self, file: &str) -> PioResult<()> {
        let (comm, session, transport) = self.session_link(file, "eam_pio_enddef")?;
        session.enddef(IoLink {
            comm: comm.as_ref(),
            transport,
        })
    }

    /// 推进时间槽并记录模拟时间
    pub fn pio_update_time(&mut self, file: &str, time: f64) -> PioResult<()> {
        let (comm, session, transport) = self.session_link(file, "pio_update_time")?;
        session
            .update_time(
                IoLink {
                    comm: comm.as_ref(),
                    transport,
                },
                time,
            )
            .map(|_| ())
    }

    /// 写入变量在当前时间槽的本地数据（集合操作）
    pub fn grid_write_data_array<T: Element>(
        &mut self,
        file: &str,
        var: &str,
        buf: &[T],
    ) -> PioResult<()> {
        let (comm, session, transport) = self.session_link(file, "grid_write_data_array")?;
        session.write(
            IoLink {
                comm: comm.as_ref(),
                transport,
            },
            var,
            buf,
        )
    }

    /// 读取变量在指定时间槽的本地数据（集合操作）
    pub fn grid_read_data_array<T: Element>(
        &mut self,
        file: &str,
        var: &str,
        time_index: usize,
        buf: &mut [T],
    ) -> PioResult<()> {
        let (comm, session, transport) = self.session_link(file, "grid_read_data_array")?;
        session.read(
            IoLink {
                comm: comm.as_ref(),
                transport,
            },
            var,
            time_index,
            buf,
        )
    }

    /// 关闭文件（集合操作）
    pub fn eam_pio_closefile(&mut self, file: &str) -> PioResult<()> {
        let (comm, session, transport) = self.session_link(file, "eam_pio_closefile")?;
        session.close(IoLink {
            comm: comm.as_ref(),
            transport,
        })?;
        info!(file, "文件已关闭");
        Ok(())
    }

    // ========== 查询与属性 ==========

    /// 文件是否已打开；`mode` 为 `None` 时不区分模式
    pub fn is_file_open(&self, file: &str, mode: Option<FileMode>) -> bool {
        self.sessions
            .get(file)
            .filter(|s| s.is_open())
            .map_or(false, |s| mode.map_or(true, |m| s.mode() == m))
    }

    /// 会话状态
    pub fn file_state(&self, file: &str) -> Option<SessionState> {
        self.sessions.get(file).map(FileSession::state)
    }

    /// 读取全局整数属性
    pub fn get_int_attribute(&self, file: &str, attr: &str) -> PioResult<i32> {
        self.session(file, "get_int_attribute")?.get_int_attribute(attr)
    }

    /// 写入全局整数属性（集合操作）
    pub fn set_int_attribute(&mut self, file: &str, attr: &str, value: i32) -> PioResult<()> {
        let (comm, session, transport) = self.session_link(file, "set_int_attribute")?;
        session.set_int_attribute(
            IoLink {
                comm: comm.as_ref(),
                transport,
            },
            attr,
            value,
        )
    }

    /// 维度长度；无限维度返回当前时间槽数
    pub fn get_dimlen(&self, file: &str, dim: &str) -> PioResult<usize> {
        self.session(file, "get_dimlen")?.get_dimlen(dim)
    }

    /// 当前时间槽
    pub fn time_slot(&self, file: &str) -> PioResult<usize> {
        Ok(self.session(file, "time_slot")?.time_slot())
    }

    /// 各时间槽的模拟时间
    pub fn time_values(&self, file: &str) -> PioResult<&[f64]> {
        Ok(self.session(file, "time_values")?.catalog().time_values.as_slice())
    }

    /// 文件会话（只读）
    pub fn file(&self, file: &str) -> Option<&FileSession> {
        self.sessions.get(file)
    }
}

impl Drop for IoSubsystem {
    fn drop(&mut self) {
        if self.is_initialized() {
            if let Err(e) = self.finalize() {
                warn!("drop 时 finalize 失败: {}", e);
            }
        }
    }
}
