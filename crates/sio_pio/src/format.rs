// crates/sio_pio/src/format.rs

//! SCIO 自描述二进制格式
//!
//! # 文件格式 (v1)
//!
//! ```text
//! [魔数: 4 bytes] "SCIO"
//! [版本: u32]
//! [头长度: u64]
//! [文件头: JSON]              维度、变量、整数属性、时间槽值
//! 对文件头中的每个变量（按名称排序）:
//!   [元素数: u64]
//!   [数据: n * 元素宽度]      int → i32, real(f32) → f32, real(f64) → f64
//! [CRC32: u32]
//! ```
//!
//! 所有整数与浮点均为小端序。

use thiserror::Error;

use crate::catalog::Catalog;
use crate::image::{FileImage, VarData};
use crate::kind::DataKind;

/// 格式版本
const FORMAT_VERSION: u32 = 1;

/// 魔数
const FORMAT_MAGIC: &[u8; 4] = b"SCIO";

/// 格式错误
#[derive(Debug, Error)]
pub enum FormatError {
    /// 文件太短
    #[error("文件太小: {0} 字节")]
    TooShort(usize),

    /// 魔数不符
    #[error("无效的 SCIO 文件格式")]
    BadMagic,

    /// 版本不兼容
    #[error("版本不兼容: 文件版本 {file}, 当前版本 {current}")]
    Version { file: u32, current: u32 },

    /// 校验和错误
    #[error("校验和错误: 期望 {expected:08x}, 实际 {found:08x}")]
    Checksum { expected: u32, found: u32 },

    /// 文件头解析失败
    #[error("文件头解析失败: {0}")]
    Header(#[from] serde_json::Error),

    /// 数据截断
    #[error("数据截断: 变量 {0}")]
    Truncated(String),
}

/// 编码镜像
pub fn encode(image: &FileImage) -> Result<Vec<u8>, FormatError> {
    let header = serde_json::to_vec(&image.catalog)?;

    let mut data = Vec::new();
    data.extend_from_slice(FORMAT_MAGIC);
    data.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    data.extend_from_slice(&(header.len() as u64).to_le_bytes());
    data.extend_from_slice(&header);

    for (name, var) in &image.catalog.variables {
        let values = image.data.get(name).map_or(&[][..], |d| d.values.as_slice());
        data.extend_from_slice(&(values.len() as u64).to_le_bytes());
        match var.kind {
            DataKind::Int => {
                for &v in values {
                    data.extend_from_slice(&(v as i32).to_le_bytes());
                }
            }
            DataKind::Real(p) if p.is_f32() => {
                for &v in values {
                    data.extend_from_slice(&(v as f32).to_le_bytes());
                }
            }
            DataKind::Real(_) => {
                for &v in values {
                    data.extend_from_slice(&v.to_le_bytes());
                }
            }
        }
    }

    let crc = compute_crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    Ok(data)
}

/// 解码完整镜像
pub fn decode(bytes: &[u8]) -> Result<FileImage, FormatError> {
    let body = verify(bytes)?;
    let (catalog, mut offset) = parse_header(body)?;

    let mut image = FileImage::new(catalog);
    let names: Vec<(String, DataKind)> = image
        .catalog
        .variables
        .iter()
        .map(|(n, v)| (n.clone(), v.kind))
        .collect();

    for (name, kind) in names {
        let n = read_u64(body, offset).ok_or_else(|| FormatError::Truncated(name.clone()))? as usize;
        offset += 8;
        let width = kind.size_bytes();
        let end = n
            .checked_mul(width)
            .and_then(|len| offset.checked_add(len))
            .filter(|&end| end <= body.len())
            .ok_or_else(|| FormatError::Truncated(name.clone()))?;
        let values: Vec<f64> = body[offset..end]
            .chunks_exact(width)
            .map(|chunk| decode_element(kind, chunk))
            .collect();
        offset = end;
        image.data.insert(name, VarData { values });
    }

    Ok(image)
}

/// 仅解码文件头（不加载数据）
pub fn decode_header(bytes: &[u8]) -> Result<Catalog, FormatError> {
    let body = verify(bytes)?;
    parse_header(body).map(|(catalog, _)| catalog)
}

/// 校验魔数、版本和 CRC，返回去掉 CRC 的主体
fn verify(bytes: &[u8]) -> Result<&[u8], FormatError> {
    // 至少需要魔数 + 版本 + 头长度 + CRC
    if bytes.len() < 20 {
        return Err(FormatError::TooShort(bytes.len()));
    }

    let crc_offset = bytes.len() - 4;
    let body = &bytes[..crc_offset];
    let mut crc_bytes = [0u8; 4];
    crc_bytes.copy_from_slice(&bytes[crc_offset..]);
    let stored = u32::from_le_bytes(crc_bytes);
    let computed = compute_crc32(body);
    if stored != computed {
        return Err(FormatError::Checksum {
            expected: stored,
            found: computed,
        });
    }

    if &body[..4] != FORMAT_MAGIC {
        return Err(FormatError::BadMagic);
    }

    let mut version_bytes = [0u8; 4];
    version_bytes.copy_from_slice(&body[4..8]);
    let version = u32::from_le_bytes(version_bytes);
    if version > FORMAT_VERSION {
        return Err(FormatError::Version {
            file: version,
            current: FORMAT_VERSION,
        });
    }

    Ok(body)
}

/// 解析文件头，返回目录和数据区起始偏移
fn parse_header(body: &[u8]) -> Result<(Catalog, usize), FormatError> {
    let header_len = read_u64(body, 8).ok_or(FormatError::TooShort(body.len()))? as usize;
    let start = 16usize;
    let end = start
        .checked_add(header_len)
        .filter(|&end| end <= body.len())
        .ok_or_else(|| FormatError::Truncated("文件头".to_string()))?;
    let catalog: Catalog = serde_json::from_slice(&body[start..end])?;
    Ok((catalog, end))
}

fn read_u64(bytes: &[u8], offset: usize) -> Option<u64> {
    let slice = bytes.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Some(u64::from_le_bytes(buf))
}

fn decode_element(kind: DataKind, chunk: &[u8]) -> f64 {
    match kind {
        DataKind::Int => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(chunk);
            i32::from_le_bytes(buf) as f64
        }
        DataKind::Real(p) if p.is_f32() => {
            let mut buf = [0u8; 4];
            buf.copy_from_slice(chunk);
            f32::from_le_bytes(buf) as f64
        }
        DataKind::Real(_) => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(chunk);
            f64::from_le_bytes(buf)
        }
    }
}

/// 计算 CRC32 校验和（IEEE 多项式）
fn compute_crc32(data: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in data {
        let index = ((crc ^ byte as u32) & 0xFF) as usize;
        crc = CRC32_TABLE[index] ^ (crc >> 8);
    }
    !crc
}

/// 生成 CRC32 查找表（编译期计算）
const fn generate_crc32_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut j = 0;
        while j < 8 {
            if crc & 1 != 0 {
                crc = 0xEDB8_8320 ^ (crc >> 1);
            } else {
                crc >>= 1;
            }
            j += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

const CRC32_TABLE: [u32; 256] = generate_crc32_table();
