// crates/sio_pio/src/wire.rs

//! 进程间交换的字节打包
//!
//! 只在同一次运行的进程组内流动，不落盘，使用本机字节序。

use bytemuck::{cast_slice, pod_collect_to_vec};
use sio_comm::Communicator;

const STATUS_OK: u8 = 1;
const STATUS_ERR: u8 = 0;

/// 打包 i64 序列
pub fn pack_i64(values: &[i64]) -> Vec<u8> {
    cast_slice(values).to_vec()
}

/// 解包 i64 序列
pub fn unpack_i64(bytes: &[u8]) -> Vec<i64> {
    pod_collect_to_vec(bytes)
}

/// 打包 f64 序列
pub fn pack_f64(values: &[f64]) -> Vec<u8> {
    cast_slice(values).to_vec()
}

/// 解包 f64 序列
pub fn unpack_f64(bytes: &[u8]) -> Vec<f64> {
    pod_collect_to_vec(bytes)
}

/// 打包一个进程的写入贡献：`[n][offsets; n][values; n]`
pub fn pack_contribution(offsets: &[i64], values: &[f64]) -> Vec<u8> {
    debug_assert_eq!(offsets.len(), values.len());
    let n = offsets.len() as u64;
    let mut out = Vec::with_capacity(8 + 16 * offsets.len());
    out.extend_from_slice(&n.to_ne_bytes());
    out.extend_from_slice(cast_slice(offsets));
    out.extend_from_slice(cast_slice(values));
    out
}

/// 解包写入贡献，长度不符时返回 `None`
pub fn unpack_contribution(bytes: &[u8]) -> Option<(Vec<i64>, Vec<f64>)> {
    let head: [u8; 8] = bytes.get(..8)?.try_into().ok()?;
    let n = u64::from_ne_bytes(head) as usize;
    let body = &bytes[8..];
    if body.len() != n * 16 {
        return None;
    }
    let (offsets, values) = body.split_at(n * 8);
    Some((unpack_i64(offsets), unpack_f64(values)))
}

/// 由根进程广播成败，所有进程得到相同结论
pub fn share_verdict(
    comm: &dyn Communicator,
    root: usize,
    verdict: Result<(), String>,
) -> Result<(), String> {
    share_payload(comm, root, verdict.map(|_| Vec::new())).map(|_| ())
}

/// 由根进程广播结果数据或错误信息
pub fn share_payload(
    comm: &dyn Communicator,
    root: usize,
    result: Result<Vec<u8>, String>,
) -> Result<Vec<u8>, String> {
    let mut message = Vec::new();
    if comm.rank() == root {
        match &result {
            Ok(payload) => {
                message.push(STATUS_OK);
                message.extend_from_slice(payload);
            }
            Err(reason) => {
                message.push(STATUS_ERR);
                message.extend_from_slice(reason.as_bytes());
            }
        }
    }
    let received = comm.broadcast(root, &message);
    if comm.rank() == root {
        return result;
    }
    match received.split_first() {
        Some((&STATUS_OK, payload)) => Ok(payload.to_vec()),
        Some((_, reason)) => Err(String::from_utf8_lossy(reason).into_owned()),
        None => Err("根进程未返回状态".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sio_comm::{SerialComm, ThreadComm};

    #[test]
    fn test_contribution_layout() {
        let bytes = pack_contribution(&[5, 6], &[1.5, -2.0]);
        assert_eq!(bytes.len(), 8 + 32);
        let (offsets, values) = unpack_contribution(&bytes).unwrap();
        assert_eq!(offsets, vec![5, 6]);
        assert_eq!(values, vec![1.5, -2.0]);
    }

    #[test]
    fn test_truncated_contribution() {
        let bytes = pack_contribution(&[1, 2, 3], &[0.0, 0.0, 0.0]);
        assert!(unpack_contribution(&bytes[..bytes.len() - 1]).is_none());
        assert!(unpack_contribution(&[0u8; 3]).is_none());
    }

    #[test]
    fn test_empty_contribution() {
        let (o, v) = unpack_contribution(&pack_contribution(&[], &[])).unwrap();
        assert!(o.is_empty() && v.is_empty());
    }

    #[test]
    fn test_share_serial() {
        let comm = SerialComm::new();
        assert_eq!(share_payload(&comm, 0, Ok(vec![9])), Ok(vec![9]));
        assert_eq!(share_verdict(&comm, 0, Err("bad".into())), Err("bad".into()));
    }

    #[test]
    fn test_share_reaches_all_ranks() {
        let handles: Vec<_> = ThreadComm::group(3)
            .into_iter()
            .map(|comm| {
                std::thread::spawn(move || {
                    let local = if comm.rank() == 0 {
                        Err("磁盘已满".to_string())
                    } else {
                        Ok(Vec::new())
                    };
                    share_payload(&comm, 0, local)
                })
            })
            .collect();
        for h in handles {
            assert_eq!(h.join().unwrap(), Err("磁盘已满".to_string()));
        }
    }
}
