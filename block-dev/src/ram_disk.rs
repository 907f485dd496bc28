use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;

use crate::{BLOCK_SIZE, BlockDevice, DeviceError, check_access};

/// 内存中的块设备
#[derive(Debug)]
pub struct RamDisk {
    blocks: Mutex<Vec<u8>>,
    count: usize,
}

impl RamDisk {
    pub fn new(count: usize) -> Self {
        Self {
            blocks: Mutex::new(vec![0; count * BLOCK_SIZE]),
            count,
        }
    }

    /// 整个设备内容的拷贝
    pub fn snapshot(&self) -> Vec<u8> {
        self.blocks.lock().clone()
    }
}

impl BlockDevice for RamDisk {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.count, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        buf.copy_from_slice(&self.blocks.lock()[start..start + BLOCK_SIZE]);
        Ok(())
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.count, buf.len())?;
        let start = block_id * BLOCK_SIZE;
        self.blocks.lock()[start..start + BLOCK_SIZE].copy_from_slice(buf);
        Ok(())
    }

    fn block_count(&self) -> usize {
        self.count
    }
}
