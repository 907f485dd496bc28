//! 块设备抽象
//!
//! 只提供整块读写，文件系统从不对设备做块内的部分读写。

#![no_std]

extern crate alloc;

mod ram_disk;

pub use self::ram_disk::RamDisk;

/// 一个块的字节量
pub const BLOCK_SIZE: usize = 4096;

pub trait BlockDevice: Send + Sync {
    /// 读取`block_id`号块，`buf`必须恰好为[`BLOCK_SIZE`]字节
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError>;

    /// 写入`block_id`号块，`buf`必须恰好为[`BLOCK_SIZE`]字节
    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError>;

    /// 设备的总块数
    fn block_count(&self) -> usize;

    /// 将已写入的块落盘
    fn flush(&self) -> Result<(), DeviceError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("backing store cannot be opened")]
    Unavailable,
    #[error("block {block_id} is out of range, device has {count} blocks")]
    OutOfRange { block_id: usize, count: usize },
    #[error("buffer of {len} bytes is not a whole block")]
    BadBuffer { len: usize },
    #[error("I/O failure at block {block_id}")]
    Io { block_id: usize },
}

/// 检查块号与缓冲区长度，供各设备实现共用
pub fn check_access(block_id: usize, count: usize, len: usize) -> Result<(), DeviceError> {
    if len != BLOCK_SIZE {
        return Err(DeviceError::BadBuffer { len });
    }
    if block_id >= count {
        return Err(DeviceError::OutOfRange { block_id, count });
    }
    Ok(())
}
