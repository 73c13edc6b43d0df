// crates/sio_pio/src/export.rs

//! 导出为 netCDF 文件
//!
//! 把 SCIO 文件镜像按原有维度、变量与整数属性写成 netCDF，
//! 无限维度的各时间槽时间写入同名坐标变量。
//!
//! 需要启用 `netcdf` feature（依赖系统 netCDF C 库），
//! 未启用时 [`export_netcdf`] 返回传输故障。

use std::path::Path;

use crate::error::{PioError, PioResult};
use crate::image::FileImage;

const OP: &str = "export_netcdf";

/// 导出文件镜像
#[cfg(feature = "netcdf")]
pub fn export_netcdf(image: &FileImage, path: &Path) -> PioResult<()> {
    use crate::catalog::DimLength;
    use crate::kind::DataKind;
    use sio_config::Precision;

    let name = path.display().to_string();
    let nc_err = |e: netcdf::error::Error| PioError::transport(name.as_str(), OP, e.to_string());

    let mut padded = image.clone();
    padded.pad_to_slots();
    let catalog = &padded.catalog;
    let slots = catalog.num_time_slots();

    let mut file = netcdf::create(path).map_err(nc_err)?;
    for dim in catalog.dimensions_in_order() {
        match dim.length {
            DimLength::Fixed(n) => file.add_dimension(&dim.name, n).map(|_| ()),
            DimLength::Unlimited => file.add_unlimited_dimension(&dim.name).map(|_| ()),
        }
        .map_err(nc_err)?;
    }
    for (attr, value) in &catalog.attributes {
        file.add_attribute(attr, *value).map_err(nc_err)?;
    }

    // 时间坐标
    if let Some(time) = catalog.unlimited_dimension() {
        if catalog.variable(&time.name).is_none() {
            let mut var = file
                .add_variable::<f64>(&time.name, &[time.name.as_str()])
                .map_err(nc_err)?;
            if slots > 0 {
                var.put_values(&catalog.time_values, Some(&[0usize][..]), Some(&[slots][..]))
                    .map_err(nc_err)?;
            }
        }
    }

    for info in catalog.variables.values() {
        let Some(layout) = catalog.layout(&info.name) else {
            continue;
        };
        let dims: Vec<&str> = info.dimensions.iter().map(String::as_str).collect();
        let fill = info.kind.fill_value();
        let mut var = match info.kind {
            DataKind::Int => file.add_variable::<i32>(&info.name, &dims),
            DataKind::Real(Precision::F32) => file.add_variable::<f32>(&info.name, &dims),
            DataKind::Real(Precision::F64) => file.add_variable::<f64>(&info.name, &dims),
        }
        .map_err(nc_err)?;
        match info.kind {
            DataKind::Int => var.add_attribute("_FillValue", fill as i32),
            DataKind::Real(Precision::F32) => var.add_attribute("_FillValue", fill as f32),
            DataKind::Real(Precision::F64) => var.add_attribute("_FillValue", fill),
        }
        .map_err(nc_err)?;
        if !info.long_name.is_empty() {
            var.add_attribute("long_name", info.long_name.as_str())
                .map_err(nc_err)?;
        }
        if !info.units.is_empty() {
            var.add_attribute("units", info.units.as_str())
                .map_err(nc_err)?;
        }

        let values = padded
            .data
            .get(&info.name)
            .map_or(&[][..], |d| d.values.as_slice());
        if values.is_empty() {
            continue;
        }
        // 记录变量需要显式给出沿无限维度的写入长度
        let mut extent: Vec<usize> = info
            .dimensions
            .iter()
            .map(|d| catalog.dim_len(d).unwrap_or(0))
            .collect();
        if layout.record {
            extent[0] = slots;
        }
        let start = vec![0usize; extent.len()];
        match info.kind {
            DataKind::Int => {
                let ints: Vec<i32> = values.iter().map(|&v| v as i32).collect();
                var.put_values(&ints, Some(start.as_slice()), Some(extent.as_slice()))
            }
            DataKind::Real(Precision::F32) => {
                let reals: Vec<f32> = values.iter().map(|&v| v as f32).collect();
                var.put_values(&reals, Some(start.as_slice()), Some(extent.as_slice()))
            }
            DataKind::Real(Precision::F64) => {
                var.put_values(values, Some(start.as_slice()), Some(extent.as_slice()))
            }
        }
        .map_err(nc_err)?;
    }

    tracing::info!(file = %name, vars = catalog.variables.len(), slots, "已导出 netCDF");
    Ok(())
}

/// 导出文件镜像（无 netCDF 支持）
#[cfg(not(feature = "netcdf"))]
pub fn export_netcdf(_image: &FileImage, path: &Path) -> PioResult<()> {
    Err(PioError::transport(
        path.display().to_string(),
        OP,
        "未启用 netcdf feature",
    ))
}
