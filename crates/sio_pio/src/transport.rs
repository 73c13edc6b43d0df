// crates/sio_pio/src/transport.rs

//! 传输层接口
//!
//! 文件会话通过 [`Transport`] 完成全部物理 IO。每个方法都是集合操作，
//! 组内所有进程必须以相同顺序调用。
//!
//! [`GatherTransport`] 采用单 IO 根进程模型：根进程持有文件镜像并独占
//! 访问存储；写入时各进程的 (偏移, 值) 收集到根进程散布进全局数组，
//! 读取时根进程广播整帧，各进程按自己的偏移取值。根进程上的失败会
//! 广播给所有进程，保证各进程得到一致的结果。

use std::collections::HashMap;

use sio_comm::Communicator;
use tracing::{debug, info};

use crate::catalog::{Catalog, VarLayout};
use crate::error::{PioError, PioResult};
use crate::format;
use crate::image::FileImage;
use crate::kind::{DataKind, FileMode};
use crate::store::Store;
use crate::wire;

/// 传输目标变量
#[derive(Debug, Clone, Copy)]
pub struct VarTarget<'a> {
    /// 变量名
    pub name: &'a str,
    /// 数值类型
    pub kind: DataKind,
    /// 存储布局
    pub layout: VarLayout,
}

/// 传输层 trait
pub trait Transport: Send {
    /// 传输层名称（用于日志）
    fn name(&self) -> &'static str;

    /// 创建写文件
    fn create(&mut self, comm: &dyn Communicator, file: &str) -> PioResult<()>;

    /// 打开已有文件用于读取，返回文件头
    fn open(&mut self, comm: &dyn Communicator, file: &str) -> PioResult<Catalog>;

    /// 结束定义阶段，提交文件结构
    fn enddef(&mut self, comm: &dyn Communicator, file: &str, catalog: &Catalog) -> PioResult<()>;

    /// 写全局整数属性
    fn put_int_attribute(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        name: &str,
        value: i32,
    ) -> PioResult<()>;

    /// 推进时间槽并记录时间值
    fn update_time(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        slot: usize,
        value: f64,
    ) -> PioResult<()>;

    /// 写入变量的一个时间槽
    ///
    /// `offsets` 为 `None` 表示非分布式变量，`values` 为完整数组。
    fn write_darray(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        var: VarTarget<'_>,
        frame: usize,
        offsets: Option<&[i64]>,
        values: &[f64],
    ) -> PioResult<()>;

    /// 读取变量的一个时间槽
    fn read_darray(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        var: VarTarget<'_>,
        frame: usize,
        offsets: Option<&[i64]>,
        out: &mut [f64],
    ) -> PioResult<()>;

    /// 关闭文件，写模式下落盘
    fn close(&mut self, comm: &dyn Communicator, file: &str) -> PioResult<()>;
}

/// 已打开文件
#[derive(Debug)]
struct OpenFile {
    mode: FileMode,
    /// 仅根进程持有
    image: Option<FileImage>,
}

/// 单 IO 根进程传输层
#[derive(Debug)]
pub struct GatherTransport<S: Store> {
    store: S,
    root: usize,
    files: HashMap<String, OpenFile>,
}

impl<S: Store> GatherTransport<S> {
    /// 以 0 号进程为 IO 根创建传输层
    pub fn new(store: S) -> Self {
        Self::with_root(store, 0)
    }

    /// 指定 IO 根进程
    pub fn with_root(store: S, root: usize) -> Self {
        Self {
            store,
            root,
            files: HashMap::new(),
        }
    }

    /// 底层存储
    pub fn store(&self) -> &S {
        &self.store
    }

    /// 当前打开的文件数
    pub fn open_count(&self) -> usize {
        self.files.len()
    }

    fn not_open(file: &str, op: &'static str) -> PioError {
        PioError::transport(file, op, "传输层中没有该文件的句柄")
    }

    /// 根进程上修改镜像，其余进程只参与同步
    fn with_root_image<F>(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        op: &'static str,
        f: F,
    ) -> PioResult<()>
    where
        F: FnOnce(&mut FileImage) -> PioResult<()>,
    {
        let local = match self.files.get_mut(file) {
            Some(open) => match open.image.as_mut() {
                Some(image) => f(image).map(|_| Vec::new()),
                None => Ok(Vec::new()),
            },
            None => Err(Self::not_open(file, op)),
        };
        settle(comm, self.root, file, op, local).map(|_| ())
    }
}

/// 广播根进程的结果；各进程优先返回自身的本地错误
fn settle(
    comm: &dyn Communicator,
    root: usize,
    file: &str,
    op: &'static str,
    local: PioResult<Vec<u8>>,
) -> PioResult<Vec<u8>> {
    let (shared_in, own_err) = match local {
        Ok(payload) => (Ok(payload), None),
        Err(e) => (Err(e.to_string()), Some(e)),
    };
    let shared = wire::share_payload(comm, root, shared_in);
    if let Some(e) = own_err {
        return Err(e);
    }
    shared.map_err(|msg| PioError::transport(file, op, format!("IO 根进程报告失败: {}", msg)))
}

/// 把各进程的贡献散布进镜像
fn apply_contributions(
    image: &mut FileImage,
    file: &str,
    var: VarTarget<'_>,
    frame: usize,
    parts: &[Vec<u8>],
) -> PioResult<()> {
    let fill = var.kind.fill_value();
    for (rank, part) in parts.iter().enumerate() {
        let (offsets, values) = wire::unpack_contribution(part).ok_or_else(|| {
            PioError::transport(
                file,
                "grid_write_data_array",
                format!("rank {} 的数据包损坏", rank),
            )
        })?;
        image
            .scatter(var.name, var.layout, frame, fill, &offsets, &values)
            .map_err(|bad| {
                PioError::transport(
                    file,
                    "grid_write_data_array",
                    format!("rank {} 的偏移 {} 超出变量 {}", rank, bad, var.name),
                )
            })?;
    }
    Ok(())
}

impl<S: Store> Transport for GatherTransport<S> {
    fn name(&self) -> &'static str {
        self.store.name()
    }

    fn create(&mut self, comm: &dyn Communicator, file: &str) -> PioResult<()> {
        let is_root = comm.rank() == self.root;
        let local = if self.files.contains_key(file) {
            Err(PioError::transport(file, "register_file", "传输层中该文件已打开"))
        } else {
            Ok(Vec::new())
        };
        settle(comm, self.root, file, "register_file", local)?;
        self.files.insert(
            file.to_string(),
            OpenFile {
                mode: FileMode::Write,
                image: is_root.then(FileImage::default),
            },
        );
        debug!(file, store = self.store.name(), "created");
        Ok(())
    }

    fn open(&mut self, comm: &dyn Communicator, file: &str) -> PioResult<Catalog> {
        const OP: &str = "register_file";
        let is_root = comm.rank() == self.root;

        let mut loaded = None;
        let local = if is_root {
            match self.store.load(file) {
                Ok(Some(bytes)) => format::decode(&bytes)
                    .map_err(|e| PioError::transport(file, OP, e.to_string()))
                    .and_then(|image| {
                        let header = serde_json::to_vec(&image.catalog)
                            .map_err(|e| PioError::transport(file, OP, e.to_string()))?;
                        loaded = Some(image);
                        Ok(header)
                    }),
                Ok(None) => Err(PioError::transport(file, OP, "文件不存在")),
                Err(e) => Err(PioError::transport_io(file, OP, e)),
            }
        } else {
            Ok(Vec::new())
        };

        let header = settle(comm, self.root, file, OP, local)?;
        let catalog: Catalog = serde_json::from_slice(&header)
            .map_err(|e| PioError::transport(file, OP, e.to_string()))?;

        self.files.insert(
            file.to_string(),
            OpenFile {
                mode: FileMode::Read,
                image: loaded,
            },
        );
        debug!(file, slots = catalog.num_time_slots(), "opened");
        Ok(catalog)
    }

    fn enddef(&mut self, comm: &dyn Communicator, file: &str, catalog: &Catalog) -> PioResult<()> {
        let writable = self.files.get(file).map(|f| f.mode == FileMode::Write);
        self.with_root_image(comm, file, "eam_pio_enddef", |image| {
            // 读文件的结构来自文件本身
            if writable == Some(true) {
                image.catalog = catalog.clone();
            }
            Ok(())
        })
    }

    fn put_int_attribute(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        name: &str,
        value: i32,
    ) -> PioResult<()> {
        self.with_root_image(comm, file, "set_int_attribute", |image| {
            image.catalog.attributes.insert(name.to_string(), value);
            Ok(())
        })
    }

    fn update_time(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        slot: usize,
        value: f64,
    ) -> PioResult<()> {
        self.with_root_image(comm, file, "pio_update_time", |image| {
            let expected = image.catalog.time_values.len() + 1;
            if slot != expected {
                return Err(PioError::transport(
                    file,
                    "pio_update_time",
                    format!("时间槽不连续: 期望 {}, 实际 {}", expected, slot),
                ));
            }
            image.catalog.time_values.push(value);
            Ok(())
        })
    }

    fn write_darray(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        var: VarTarget<'_>,
        frame: usize,
        offsets: Option<&[i64]>,
        values: &[f64],
    ) -> PioResult<()> {
        const OP: &str = "grid_write_data_array";
        let root = self.root;

        let local = match offsets {
            Some(offsets) => {
                let packed = wire::pack_contribution(offsets, values);
                let gathered = comm.gather(root, &packed);
                match (self.files.get_mut(file), gathered) {
                    (None, _) => Err(Self::not_open(file, OP)),
                    (Some(open), Some(parts)) => match open.image.as_mut() {
                        Some(image) => apply_contributions(image, file, var, frame, &parts),
                        None => Ok(()),
                    },
                    (Some(_), None) => Ok(()),
                }
            }
            // 非分布式变量以根进程的数据为准
            None => match self.files.get_mut(file) {
                None => Err(Self::not_open(file, OP)),
                Some(open) => {
                    if let Some(image) = open.image.as_mut() {
                        image.put_frame(var.name, var.layout, frame, var.kind.fill_value(), values);
                    }
                    Ok(())
                }
            },
        };

        settle(comm, root, file, OP, local.map(|_| Vec::new()))?;
        debug!(file, var = var.name, frame, n = values.len(), "write_darray");
        Ok(())
    }

    fn read_darray(
        &mut self,
        comm: &dyn Communicator,
        file: &str,
        var: VarTarget<'_>,
        frame: usize,
        offsets: Option<&[i64]>,
        out: &mut [f64],
    ) -> PioResult<()> {
        const OP: &str = "grid_read_data_array";

        let local = match self.files.get(file) {
            None => Err(Self::not_open(file, OP)),
            Some(open) => Ok(open.image.as_ref().map_or_else(Vec::new, |image| {
                wire::pack_f64(&image.frame(var.name, var.layout, frame, var.kind.fill_value()))
            })),
        };

        let payload = settle(comm, self.root, file, OP, local)?;
        let global = wire::unpack_f64(&payload);

        match offsets {
            Some(offsets) => {
                for (dst, &offset) in out.iter_mut().zip(offsets) {
                    *dst = usize::try_from(offset)
                        .ok()
                        .and_then(|i| global.get(i).copied())
                        .ok_or_else(|| {
                            PioError::transport(
                                file,
                                OP,
                                format!("偏移 {} 超出变量 {} 的全局大小 {}", offset, var.name, global.len()),
                            )
                        })?;
                }
            }
            None => {
                if global.len() < out.len() {
                    return Err(PioError::transport(
                        file,
                        OP,
                        format!("变量 {} 只有 {} 个元素", var.name, global.len()),
                    ));
                }
                out.copy_from_slice(&global[..out.len()]);
            }
        }
        debug!(file, var = var.name, frame, n = out.len(), "read_darray");
        Ok(())
    }

    fn close(&mut self, comm: &dyn Communicator, file: &str) -> PioResult<()> {
        const OP: &str = "eam_pio_closefile";

        let local = match self.files.remove(file) {
            None => Err(Self::not_open(file, OP)),
            Some(OpenFile {
                mode: FileMode::Write,
                image: Some(mut image),
            }) => {
                image.pad_to_slots();
                format::encode(&image)
                    .map_err(|e| PioError::transport(file, OP, e.to_string()))
                    .and_then(|bytes| {
                        self.store
                            .save(file, &bytes)
                            .map_err(|e| PioError::transport_io(file, OP, e))
                            .map(|_| {
                                info!(file, bytes = bytes.len(), store = self.store.name(), "flushed");
                                Vec::new()
                            })
                    })
            }
            Some(_) => Ok(Vec::new()),
        };

        settle(comm, self.root, file, OP, local).map(|_| ())
    }
}
