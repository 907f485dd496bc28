use std::cell::RefCell;
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

use block_dev::{BLOCK_SIZE, BlockDevice, DeviceError, check_access};
use send_wrapper::SendWrapper;

/// 以宿主文件作为块设备，文件长度即块数乘以[`BLOCK_SIZE`]
#[derive(Debug)]
pub struct BlockFile {
    inner: SendWrapper<RefCell<File>>,
    count: usize,
}

impl BlockFile {
    pub fn open(path: &Path) -> io::Result<Self> {
        let fd = OpenOptions::new().read(true).write(true).open(path)?;
        let count = fd.metadata()?.len() as usize / BLOCK_SIZE;
        Ok(Self::new(fd, count))
    }

    /// 新建（或截断）一个`count`块的镜像
    pub fn create(path: &Path, count: usize) -> io::Result<Self> {
        let fd = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        fd.set_len((count * BLOCK_SIZE) as u64)?;
        Ok(Self::new(fd, count))
    }

    fn new(fd: File, count: usize) -> Self {
        Self {
            inner: SendWrapper::new(RefCell::new(fd)),
            count,
        }
    }
}

impl BlockDevice for BlockFile {
    fn read_block(&self, block_id: usize, buf: &mut [u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.count, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| file.read_exact(buf))
            .map_err(|err| io_error(block_id, err))
    }

    fn write_block(&self, block_id: usize, buf: &[u8]) -> Result<(), DeviceError> {
        check_access(block_id, self.count, buf.len())?;
        let mut file = self.inner.borrow_mut();
        file.seek(SeekFrom::Start((block_id * BLOCK_SIZE) as u64))
            .and_then(|_| file.write_all(buf))
            .map_err(|err| io_error(block_id, err))
    }

    fn block_count(&self) -> usize {
        self.count
    }

    fn flush(&self) -> Result<(), DeviceError> {
        let mut file = self.inner.borrow_mut();
        file.flush()
            .and_then(|_| file.sync_all())
            .map_err(|err| io_error(self.count, err))
    }
}

fn io_error(block_id: usize, err: io::Error) -> DeviceError {
    log::error!("I/O error at block {block_id}: {err}");
    DeviceError::Io { block_id }
}
