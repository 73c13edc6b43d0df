// crates/sio_pio/src/image.rs

//! 文件内存镜像
//!
//! IO 根进程为每个打开的文件维护一份全局数组镜像：目录（文件头）
//! 加上每个变量按时间槽拼接的数据。数据统一以 f64 保存，
//! 编码落盘时再按变量类型收窄。

use std::collections::BTreeMap;

use crate::catalog::{Catalog, VarLayout};

/// 变量在镜像中的存储
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VarData {
    /// 按时间槽拼接的值
    pub values: Vec<f64>,
}

/// 文件镜像
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileImage {
    /// 文件头
    pub catalog: Catalog,
    /// 变量数据
    pub data: BTreeMap<String, VarData>,
}

impl FileImage {
    /// 由目录创建空镜像
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            data: BTreeMap::new(),
        }
    }

    /// 某变量已存储的时间槽数
    pub fn stored_frames(&self, var: &str, layout: VarLayout) -> usize {
        let len = self.data.get(var).map_or(0, |d| d.values.len());
        if layout.frame_len == 0 {
            0
        } else {
            len / layout.frame_len
        }
    }

    /// 取得（必要时扩展）某个时间槽的可写切片
    ///
    /// `frame` 对记录变量是从 1 开始的槽号，非记录变量忽略。
    fn frame_mut(&mut self, var: &str, layout: VarLayout, frame: usize, fill: f64) -> &mut [f64] {
        let index = if layout.record { frame.saturating_sub(1) } else { 0 };
        let start = index * layout.frame_len;
        let end = start + layout.frame_len;
        let values = &mut self.data.entry(var.to_string()).or_default().values;
        if values.len() < end {
            values.resize(end, fill);
        }
        &mut values[start..end]
    }

    /// 按全局偏移写入
    ///
    /// 偏移越界时返回首个越界偏移。
    pub fn scatter(
        &mut self,
        var: &str,
        layout: VarLayout,
        frame: usize,
        fill: f64,
        offsets: &[i64],
        values: &[f64],
    ) -> Result<(), i64> {
        let dest = self.frame_mut(var, layout, frame, fill);
        for (&offset, &value) in offsets.iter().zip(values) {
            let slot = usize::try_from(offset)
                .ok()
                .and_then(|i| dest.get_mut(i))
                .ok_or(offset)?;
            *slot = value;
        }
        Ok(())
    }

    /// 整体写入一个时间槽
    pub fn put_frame(&mut self, var: &str, layout: VarLayout, frame: usize, fill: f64, values: &[f64]) {
        let dest = self.frame_mut(var, layout, frame, fill);
        let n = dest.len().min(values.len());
        dest[..n].copy_from_slice(&values[..n]);
    }

    /// 读取一个时间槽；未写过的元素为填充值
    pub fn frame(&self, var: &str, layout: VarLayout, frame: usize, fill: f64) -> Vec<f64> {
        let index = if layout.record { frame.saturating_sub(1) } else { 0 };
        let start = index * layout.frame_len;
        let end = start + layout.frame_len;
        match self.data.get(var) {
            Some(d) if d.values.len() >= end => d.values[start..end].to_vec(),
            Some(d) if d.values.len() > start => {
                let mut out = d.values[start..].to_vec();
                out.resize(layout.frame_len, fill);
                out
            }
            _ => vec![fill; layout.frame_len],
        }
    }

    /// 把所有记录变量补齐到当前时间槽数，非记录变量补齐到一帧
    pub fn pad_to_slots(&mut self) {
        let slots = self.catalog.num_time_slots();
        let names: Vec<String> = self.catalog.variables.keys().cloned().collect();
        for name in names {
            let (Some(layout), Some(var)) = (self.catalog.layout(&name), self.catalog.variable(&name))
            else {
                continue;
            };
            let frames = if layout.record { slots } else { 1 };
            let fill = var.kind.fill_value();
            let values = &mut self.data.entry(name).or_default().values;
            let target = frames * layout.frame_len;
            if values.len() < target {
                values.resize(target, fill);
            }
        }
    }
}
