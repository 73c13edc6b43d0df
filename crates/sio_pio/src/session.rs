// crates/sio_pio/src/session.rs

//! 文件会话状态机
//!
//! 每个打开的文件对应一个 [`FileSession`]：
//!
//! ```text
//! Registered --eam_pio_enddef--> Defined --eam_pio_closefile--> Closed
//!      └--------------------eam_pio_closefile-------------------┘
//! ```
//!
//! 定义阶段（`Registered`）登记维度、变量与分解；数据阶段（`Defined`）
//! 推进时间槽并传输数据。所有协议检查都在本地完成，通过后才调用传输层。

use std::collections::BTreeSet;

use sio_comm::Communicator;
use tracing::{debug, warn};

use crate::catalog::{Catalog, DimLength, VariableInfo};
use crate::decomp::{collective_tiling_check, DecompTable};
use crate::error::{PioError, PioResult};
use crate::kind::{Element, FileMode};
use crate::transport::{Transport, VarTarget};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// 定义阶段
    Registered,
    /// 数据阶段
    Defined,
    /// 已关闭
    Closed,
}

/// 会话调用传输层所需的上下文
pub struct IoLink<'a> {
    /// 进程组
    pub comm: &'a dyn Communicator,
    /// 传输层
    pub transport: &'a mut dyn Transport,
}

/// 单个文件的会话
#[derive(Debug, Clone)]
pub struct FileSession {
    name: String,
    mode: FileMode,
    state: SessionState,
    /// 本会话可见的目录
    catalog: Catalog,
    /// 读模式下文件中实际存在的目录
    on_file: Option<Catalog>,
    decomps: DecompTable,
    decomp_set: bool,
}

impl FileSession {
    /// 新建写会话
    pub fn for_write(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mode: FileMode::Write,
            state: SessionState::Registered,
            catalog: Catalog::default(),
            on_file: None,
            decomps: DecompTable::default(),
            decomp_set: false,
        }
    }

    /// 由文件头新建读会话
    ///
    /// 维度、属性与时间槽直接取自文件；变量需经 `get_variable` 逐个确认。
    pub fn for_read(name: impl Into<String>, header: Catalog) -> Self {
        let catalog = Catalog {
            dimensions: header.dimensions.clone(),
            variables: Default::default(),
            attributes: header.attributes.clone(),
            time_values: header.time_values.clone(),
        };
        Self {
            name: name.into(),
            mode: FileMode::Read,
            state: SessionState::Registered,
            catalog,
            on_file: Some(header),
            decomps: DecompTable::default(),
            decomp_set: false,
        }
    }

    /// 文件名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 打开模式
    pub fn mode(&self) -> FileMode {
        self.mode
    }

    /// 当前状态
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// 是否仍处于打开状态
    pub fn is_open(&self) -> bool {
        self.state != SessionState::Closed
    }

    /// 会话目录
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 当前时间槽（尚未推进时为 0）
    pub fn time_slot(&self) -> usize {
        self.catalog.num_time_slots()
    }

    /// 分解表
    pub fn decomps(&self) -> &DecompTable {
        &self.decomps
    }

    // ========== 状态检查 ==========

    fn ensure_open(&self, op: &'static str) -> PioResult<()> {
        if self.state == SessionState::Closed {
            return Err(PioError::FileNotOpen {
                file: self.name.clone(),
                op,
            });
        }
        Ok(())
    }

    fn ensure_mode(&self, mode: FileMode, op: &'static str) -> PioResult<()> {
        if self.mode != mode {
            return Err(PioError::WrongMode {
                file: self.name.clone(),
                op,
                mode: self.mode,
            });
        }
        Ok(())
    }

    fn ensure_registered(&self, op: &'static str) -> PioResult<()> {
        self.ensure_open(op)?;
        if self.state != SessionState::Registered {
            return Err(PioError::DefinitionClosed {
                file: self.name.clone(),
                op,
            });
        }
        Ok(())
    }

    fn ensure_defined(&self, op: &'static str) -> PioResult<()> {
        self.ensure_open(op)?;
        if self.state != SessionState::Defined {
            return Err(PioError::NotDefined {
                file: self.name.clone(),
                op,
            });
        }
        Ok(())
    }

    fn variable(&self, var: &str) -> PioResult<&VariableInfo> {
        self.catalog
            .variable(var)
            .ok_or_else(|| PioError::UnknownVariable {
                file: self.name.clone(),
                var: var.to_string(),
            })
    }

    // ========== 定义阶段 ==========

    /// 登记维度
    pub fn register_dimension(
        &mut self,
        name: &str,
        long_name: &str,
        length: DimLength,
    ) -> PioResult<()> {
        const OP: &str = "register_dimension";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Write, OP)?;
        self.ensure_registered(OP)?;
        self.catalog.add_dimension(&self.name, name, long_name, length)
    }

    /// 登记待写变量
    pub fn register_variable(&mut self, var: VariableInfo) -> PioResult<()> {
        const OP: &str = "register_variable";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Write, OP)?;
        self.ensure_registered(OP)?;
        self.catalog.add_variable(&self.name, var).map(|_| ())
    }

    /// 确认待读变量与文件中的定义一致
    pub fn get_variable(&mut self, var: VariableInfo) -> PioResult<()> {
        const OP: &str = "get_variable";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Read, OP)?;
        self.ensure_registered(OP)?;
        self.catalog.check_shape(&self.name, &var)?;

        let stored = self
            .on_file
            .as_ref()
            .and_then(|c| c.variable(&var.name))
            .ok_or_else(|| PioError::UnknownVariable {
                file: self.name.clone(),
                var: var.name.clone(),
            })?;
        if stored.dimensions != var.dimensions {
            return Err(PioError::ShapeMismatch {
                file: self.name.clone(),
                var: var.name.clone(),
                reason: format!(
                    "文件中为 {:?}, 请求为 {:?}",
                    stored.dimensions, var.dimensions
                ),
            });
        }
        if stored.kind.class() != var.kind.class() {
            return Err(PioError::KindMismatch {
                file: self.name.clone(),
                var: var.name.clone(),
                expected: stored.kind.to_string(),
                actual: var.kind.to_string(),
            });
        }

        // 以文件中的类型与描述为准，分解标签取自调用方
        let mut confirmed = stored.clone();
        confirmed.decomp_tag = var.decomp_tag;
        self.catalog.add_variable(&self.name, confirmed).map(|_| ())
    }

    /// 为变量的分解标签绑定 DOF；返回是否覆盖了已有绑定
    pub fn set_dof(
        &mut self,
        var: &str,
        local_count: usize,
        offsets: &[i64],
        strict: bool,
    ) -> PioResult<bool> {
        const OP: &str = "set_dof";
        self.ensure_registered(OP)?;
        if self.decomp_set {
            return Err(PioError::DecompositionAlreadySet {
                file: self.name.clone(),
            });
        }
        let tag = self
            .variable(var)?
            .decomp_tag
            .clone()
            .ok_or_else(|| PioError::invalid(&self.name, OP, format!("变量 {} 没有分解标签", var)))?;
        if local_count != offsets.len() {
            return Err(PioError::SizeMismatch {
                file: self.name.clone(),
                var: var.to_string(),
                expected: local_count,
                actual: offsets.len(),
            });
        }

        let overwritten = self
            .decomps
            .set_dof(&self.name, &tag, offsets.to_vec(), strict)?;
        if overwritten {
            warn!(file = %self.name, var, tag = %tag, "DOF 重复绑定，以最后一次为准");
        }
        Ok(overwritten)
    }

    /// 为所有分布式变量完成分解绑定（集合操作）
    pub fn set_decomp(&mut self, comm: &dyn Communicator, check_tiling: bool) -> PioResult<()> {
        const OP: &str = "set_decomp";
        self.ensure_registered(OP)?;
        if self.decomp_set {
            return Err(PioError::DecompositionAlreadySet {
                file: self.name.clone(),
            });
        }

        let local = self.bind_decomps();
        // 偏移只在本地校验，需让各进程对结论达成一致
        let agreed = comm.all_agree(local.is_ok());
        let tags = local?;
        if !agreed {
            return Err(PioError::invalid(&self.name, OP, "其他进程的分解校验失败"));
        }

        if check_tiling {
            for tag in &tags {
                if let Some(decomp) = self.decomps.get(tag) {
                    collective_tiling_check(comm, 0, &self.name, decomp)?;
                }
            }
        }

        self.decomp_set = true;
        debug!(file = %self.name, tags = tags.len(), "decomposition set");
        Ok(())
    }

    /// 把每个分解标签绑定到其变量的全局大小，返回涉及的标签
    fn bind_decomps(&mut self) -> PioResult<BTreeSet<String>> {
        let mut bindings = Vec::new();
        for var in self.catalog.variables.values() {
            if let Some(tag) = &var.decomp_tag {
                let layout = self.catalog.check_shape(&self.name, var)?;
                bindings.push((tag.clone(), var.name.clone(), layout.frame_len));
            }
        }

        let mut tags = BTreeSet::new();
        for (tag, var, global_size) in bindings {
            let decomp = self.decomps.get_mut(&tag).ok_or_else(|| {
                PioError::IncompleteDecomposition {
                    file: self.name.clone(),
                    var: var.clone(),
                    tag: tag.clone(),
                    reason: "缺少 DOF",
                }
            })?;
            match decomp.global_size() {
                Some(bound) if bound != global_size => {
                    return Err(PioError::ShapeMismatch {
                        file: self.name.clone(),
                        var,
                        reason: format!(
                            "分解标签 {} 已绑定全局大小 {}, 本变量为 {}",
                            tag, bound, global_size
                        ),
                    });
                }
                Some(_) => {}
                None => decomp.bind(&self.name, global_size)?,
            }
            tags.insert(tag);
        }
        Ok(tags)
    }

    /// 结束定义阶段（集合操作）
    pub fn enddef(&mut self, link: IoLink<'_>) -> PioResult<()> {
        const OP: &str = "eam_pio_enddef";
        self.ensure_registered(OP)?;
        if !self.decomp_set {
            if let Some(var) = self.catalog.variables.values().find(|v| v.is_distributed()) {
                return Err(PioError::IncompleteDecomposition {
                    file: self.name.clone(),
                    var: var.name.clone(),
                    tag: var.decomp_tag.clone().unwrap_or_default(),
                    reason: "未调用 set_decomp",
                });
            }
        }
        link.transport.enddef(link.comm, &self.name, &self.catalog)?;
        self.state = SessionState::Defined;
        Ok(())
    }

    // ========== 数据阶段 ==========

    /// 推进时间槽，返回新槽号
    pub fn update_time(&mut self, link: IoLink<'_>, time: f64) -> PioResult<usize> {
        const OP: &str = "pio_update_time";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Write, OP)?;
        self.ensure_defined(OP)?;
        if !time.is_finite() {
            return Err(PioError::invalid(&self.name, OP, format!("时间值 {} 不是有限数", time)));
        }
        let slot = self.time_slot() + 1;
        link.transport.update_time(link.comm, &self.name, slot, time)?;
        self.catalog.time_values.push(time);
        Ok(slot)
    }

    /// 写入变量在当前时间槽的本地数据
    pub fn write<T: Element>(&self, link: IoLink<'_>, var: &str, buf: &[T]) -> PioResult<()> {
        const OP: &str = "grid_write_data_array";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Write, OP)?;
        self.ensure_defined(OP)?;

        let info = self.variable(var)?;
        self.check_element::<T>(info)?;
        let layout = self.catalog.check_shape(&self.name, info)?;
        let frame = if layout.record {
            let slot = self.time_slot();
            if slot == 0 {
                return Err(PioError::TimeIndexOutOfRange {
                    file: self.name.clone(),
                    var: var.to_string(),
                    index: 0,
                    available: 0,
                });
            }
            slot
        } else {
            0
        };

        let offsets = self.local_offsets(info)?;
        let expected = offsets.map_or(layout.frame_len, <[i64]>::len);
        if buf.len() != expected {
            return Err(PioError::SizeMismatch {
                file: self.name.clone(),
                var: var.to_string(),
                expected,
                actual: buf.len(),
            });
        }

        let values: Vec<f64> = buf.iter().map(|v| info.kind.normalize(v.to_f64())).collect();
        let target = VarTarget {
            name: var,
            kind: info.kind,
            layout,
        };
        link.transport
            .write_darray(link.comm, &self.name, target, frame, offsets, &values)
    }

    /// 读取变量在指定时间槽（从 1 开始）的本地数据
    ///
    /// 非记录变量忽略 `time_index`。
    pub fn read<T: Element>(
        &self,
        link: IoLink<'_>,
        var: &str,
        time_index: usize,
        buf: &mut [T],
    ) -> PioResult<()> {
        const OP: &str = "grid_read_data_array";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Read, OP)?;
        self.ensure_defined(OP)?;

        let info = self.variable(var)?;
        self.check_element::<T>(info)?;
        let layout = self.catalog.check_shape(&self.name, info)?;
        let frame = if layout.record {
            let available = self.time_slot();
            if time_index == 0 || time_index > available {
                return Err(PioError::TimeIndexOutOfRange {
                    file: self.name.clone(),
                    var: var.to_string(),
                    index: time_index,
                    available,
                });
            }
            time_index
        } else {
            0
        };

        let offsets = self.local_offsets(info)?;
        let expected = offsets.map_or(layout.frame_len, <[i64]>::len);
        if buf.len() != expected {
            return Err(PioError::SizeMismatch {
                file: self.name.clone(),
                var: var.to_string(),
                expected,
                actual: buf.len(),
            });
        }

        let mut values = vec![0.0; expected];
        let target = VarTarget {
            name: var,
            kind: info.kind,
            layout,
        };
        link.transport
            .read_darray(link.comm, &self.name, target, frame, offsets, &mut values)?;
        for (dst, v) in buf.iter_mut().zip(values) {
            *dst = T::from_f64(v);
        }
        Ok(())
    }

    fn check_element<T: Element>(&self, info: &VariableInfo) -> PioResult<()> {
        if info.kind.class() != T::CLASS {
            return Err(PioError::KindMismatch {
                file: self.name.clone(),
                var: info.name.clone(),
                expected: info.kind.to_string(),
                actual: T::NAME.to_string(),
            });
        }
        Ok(())
    }

    fn local_offsets(&self, info: &VariableInfo) -> PioResult<Option<&[i64]>> {
        match &info.decomp_tag {
            None => Ok(None),
            Some(tag) => self
                .decomps
                .get(tag)
                .map(|d| Some(d.offsets()))
                .ok_or_else(|| PioError::IncompleteDecomposition {
                    file: self.name.clone(),
                    var: info.name.clone(),
                    tag: tag.clone(),
                    reason: "缺少 DOF",
                }),
        }
    }

    // ========== 属性与查询 ==========

    /// 读取全局整数属性
    pub fn get_int_attribute(&self, attr: &str) -> PioResult<i32> {
        self.ensure_open("get_int_attribute")?;
        self.catalog
            .attributes
            .get(attr)
            .copied()
            .ok_or_else(|| PioError::UnknownAttribute {
                file: self.name.clone(),
                attr: attr.to_string(),
            })
    }

    /// 写入全局整数属性
    pub fn set_int_attribute(&mut self, link: IoLink<'_>, attr: &str, value: i32) -> PioResult<()> {
        const OP: &str = "set_int_attribute";
        self.ensure_open(OP)?;
        self.ensure_mode(FileMode::Write, OP)?;
        link.transport
            .put_int_attribute(link.comm, &self.name, attr, value)?;
        self.catalog.attributes.insert(attr.to_string(), value);
        Ok(())
    }

    /// 维度长度；无限维度返回当前时间槽数
    pub fn get_dimlen(&self, dim: &str) -> PioResult<usize> {
        self.ensure_open("get_dimlen")?;
        self.catalog
            .dim_len(dim)
            .ok_or_else(|| PioError::UnknownDimension {
                file: self.name.clone(),
                dim: dim.to_string(),
                context: "get_dimlen".to_string(),
            })
    }

    // ========== 关闭 ==========

    /// 关闭会话（集合操作）
    pub fn close(&mut self, link: IoLink<'_>) -> PioResult<()> {
        if self.state == SessionState::Closed {
            return Err(PioError::AlreadyClosed {
                file: self.name.clone(),
            });
        }
        self.state = SessionState::Closed;
        link.transport.close(link.comm, &self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::kind::DataKind;
    use crate::store::MemoryStore;
    use crate::transport::GatherTransport;
    use sio_comm::SerialComm;
    use sio_config::Precision;

    const REAL: DataKind = DataKind::Real(Precision::F64);

    fn link<'a>(comm: &'a SerialComm, t: &'a mut GatherTransport<MemoryStore>) -> IoLink<'a> {
        IoLink {
            comm,
            transport: t,
        }
    }

    fn defined_session(comm: &SerialComm, t: &mut GatherTransport<MemoryStore>) -> FileSession {
        t.create(comm, "s.dat").unwrap();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("time", "time", DimLength::Unlimited).unwrap();
        s.register_dimension("ncol", "columns", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["time", "ncol"]).with_decomp("col"))
            .unwrap();
        s.set_dof("ps", 4, &[0, 1, 2, 3], false).unwrap();
        s.set_decomp(comm, true).unwrap();
        s.enddef(link(comm, t)).unwrap();
        s
    }

    #[test]
    fn test_state_transitions() {
        let comm = SerialComm::new();
        let mut t = GatherTransport::new(MemoryStore::new());
        let mut s = defined_session(&comm, &mut t);
        assert_eq!(s.state(), SessionState::Defined);

        let err = s.register_dimension("lev", "", 3.into()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DefinitionClosed);

        s.close(link(&comm, &mut t)).unwrap();
        assert!(!s.is_open());
        let err = s.close(link(&comm, &mut t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyClosed);
    }

    #[test]
    fn test_record_write_needs_time_slot() {
        let comm = SerialComm::new();
        let mut t = GatherTransport::new(MemoryStore::new());
        let mut s = defined_session(&comm, &mut t);

        let err = s.write(link(&comm, &mut t), "ps", &[1.0f64; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimeIndexOutOfRange);

        assert_eq!(s.update_time(link(&comm, &mut t), 0.5).unwrap(), 1);
        s.write(link(&comm, &mut t), "ps", &[1.0f64; 4]).unwrap();
    }

    #[test]
    fn test_write_checks_buffer() {
        let comm = SerialComm::new();
        let mut t = GatherTransport::new(MemoryStore::new());
        let mut s = defined_session(&comm, &mut t);
        s.update_time(link(&comm, &mut t), 0.0).unwrap();

        let err = s.write(link(&comm, &mut t), "ps", &[1.0f64; 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);

        let err = s.write(link(&comm, &mut t), "ps", &[1i32; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KindMismatch);

        let err = s.write(link(&comm, &mut t), "nope", &[1.0f64; 4]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownVariable);
    }

    #[test]
    fn test_enddef_requires_set_decomp() {
        let comm = SerialComm::new();
        let mut t = GatherTransport::new(MemoryStore::new());
        t.create(&comm, "s.dat").unwrap();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();
        s.set_dof("ps", 4, &[0, 1, 2, 3], false).unwrap();

        let err = s.enddef(link(&comm, &mut t)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteDecomposition);
        assert_eq!(s.state(), SessionState::Registered);
    }

    #[test]
    fn test_set_decomp_missing_dof() {
        let comm = SerialComm::new();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();
        let err = s.set_decomp(&comm, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::IncompleteDecomposition);
    }

    #[test]
    fn test_set_decomp_once() {
        let comm = SerialComm::new();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();
        s.set_dof("ps", 2, &[0, 1], false).unwrap();
        s.set_decomp(&comm, false).unwrap();
        let err = s.set_decomp(&comm, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecompositionAlreadySet);
    }

    #[test]
    fn test_set_dof_after_set_decomp() {
        let comm = SerialComm::new();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();
        s.set_dof("ps", 2, &[0, 1], false).unwrap();
        s.set_decomp(&comm, false).unwrap();
        let err = s.set_dof("ps", 2, &[2, 3], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DecompositionAlreadySet);
    }

    #[test]
    fn test_set_decomp_offset_range() {
        let comm = SerialComm::new();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();
        s.set_dof("ps", 2, &[0, 4], false).unwrap();
        let err = s.set_decomp(&comm, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OffsetOutOfRange);
    }

    #[test]
    fn test_tiling_check_catches_hole() {
        let comm = SerialComm::new();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();
        s.set_dof("ps", 3, &[0, 1, 2], false).unwrap();
        let err = s.set_decomp(&comm, true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TilingViolation);
    }

    #[test]
    fn test_shared_tag_needs_same_size() {
        let comm = SerialComm::new();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_dimension("lev", "", 2.into()).unwrap();
        s.register_variable(VariableInfo::new("a", REAL, &["ncol"]).with_decomp("t"))
            .unwrap();
        s.register_variable(VariableInfo::new("b", REAL, &["ncol", "lev"]).with_decomp("t"))
            .unwrap();
        s.set_dof("a", 1, &[0], false).unwrap();
        let err = s.set_decomp(&comm, false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_set_dof_validation() {
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("ncol", "", 4.into()).unwrap();
        s.register_variable(VariableInfo::new("plain", REAL, &["ncol"])).unwrap();
        s.register_variable(VariableInfo::new("ps", REAL, &["ncol"]).with_decomp("col"))
            .unwrap();

        let err = s.set_dof("plain", 1, &[0], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = s.set_dof("ps", 3, &[0], false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SizeMismatch);

        assert!(!s.set_dof("ps", 1, &[0], false).unwrap());
        assert!(s.set_dof("ps", 2, &[0, 1], false).unwrap());
        assert_eq!(s.decomps().get("col").unwrap().offsets(), &[0i64, 1][..]);

        let err = s.set_dof("ps", 1, &[3], true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateDecomposition);
    }

    #[test]
    fn test_read_session_validates_variables() {
        let mut header = Catalog::default();
        header.add_dimension("f", "lev", "", 5.into()).unwrap();
        header.add_dimension("f", "ncol", "", 2.into()).unwrap();
        header
            .add_variable("f", VariableInfo::new("t", DataKind::Real(Precision::F32), &["lev"]))
            .unwrap();
        header.attributes.insert("step".into(), 7);

        let mut s = FileSession::for_read("f", header);
        assert_eq!(s.get_int_attribute("step").unwrap(), 7);
        assert_eq!(s.get_dimlen("lev").unwrap(), 5);

        let err = s
            .register_dimension("x", "", 1.into())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongMode);
        let err = s
            .register_variable(VariableInfo::new("t", REAL, &["lev"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WrongMode);

        let err = s.get_variable(VariableInfo::new("q", REAL, &["lev"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownVariable);
        let err = s.get_variable(VariableInfo::new("t", REAL, &["ncol"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
        let err = s
            .get_variable(VariableInfo::new("t", DataKind::Int, &["lev"]))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KindMismatch);
        let err = s.get_variable(VariableInfo::new("t", REAL, &["zz"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownDimension);

        s.get_variable(VariableInfo::new("t", REAL, &["lev"])).unwrap();
        // 以文件中的精度为准
        assert_eq!(
            s.catalog().variable("t").unwrap().kind,
            DataKind::Real(Precision::F32)
        );
    }

    #[test]
    fn test_data_ops_before_enddef() {
        let comm = SerialComm::new();
        let mut t = GatherTransport::new(MemoryStore::new());
        t.create(&comm, "s.dat").unwrap();
        let mut s = FileSession::for_write("s.dat");
        s.register_dimension("lev", "", 2.into()).unwrap();
        s.register_variable(VariableInfo::new("t", REAL, &["lev"])).unwrap();

        let err = s.write(link(&comm, &mut t), "t", &[1.0f64, 2.0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotDefined);
        let err = s.update_time(link(&comm, &mut t), 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotDefined);
    }
}
